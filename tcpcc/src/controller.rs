// Copyright (C) 2019, Cloudflare, Inc.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//
//     * Redistributions in binary form must reproduce the above copyright
//       notice, this list of conditions and the following disclaimer in the
//       documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS
// IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO,
// THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR
// PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use crate::congestion::Actions;
use crate::congestion::CongestionAlgorithm;
use crate::congestion::CongestionControl;
use crate::congestion::CongestionEvent;
use crate::congestion::TransportView;
use crate::seq::SeqNum;
use crate::state::TransportState;
use crate::Config;

#[cfg(feature = "qlog")]
use qlog::events::EventData;

/// Congestion statistics of a connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CongestionStats {
    /// The current congestion window, in bytes.
    pub cwnd: usize,

    /// The current slow start threshold, in bytes.
    pub ssthresh: usize,

    /// Whether fast recovery is in progress.
    pub in_fast_recovery: bool,

    /// The number of new ACKs processed.
    pub new_acks: u64,

    /// The number of times fast retransmit was triggered.
    pub fast_retransmits: u64,

    /// The number of retransmission timeouts acted upon.
    pub retransmit_timeouts: u64,

    /// The number of retransmission timeouts ignored as stale.
    pub stale_timeouts: u64,
}

/// Per-connection congestion controller.
///
/// Owns the connection's [`TransportState`] and the configured algorithm,
/// and turns protocol events into window updates and [`Actions`] for the
/// connection to carry out.
pub struct Controller {
    state: TransportState,

    cc: CongestionAlgorithm,

    trace_id: String,

    // Last value reported by the connection.
    bytes_in_flight: usize,

    new_acks: u64,

    fast_retransmits: u64,

    retransmit_timeouts: u64,

    stale_timeouts: u64,

    #[cfg(feature = "qlog")]
    qlog_metrics: QlogMetrics,
}

impl Controller {
    /// Creates a controller for a newly established connection.
    ///
    /// `trace_id` prefixes every log line emitted on behalf of this
    /// connection.
    pub fn new(config: &Config, trace_id: &str) -> Self {
        let cc: CongestionAlgorithm = config.cc_algorithm.into();

        let c = Controller {
            state: TransportState::from_config(config),
            cc,
            trace_id: trace_id.to_string(),
            bytes_in_flight: 0,
            new_acks: 0,
            fast_retransmits: 0,
            retransmit_timeouts: 0,
            stale_timeouts: 0,

            #[cfg(feature = "qlog")]
            qlog_metrics: QlogMetrics::default(),
        };

        debug!("{} new congestion controller: {:?}", c.trace_id, c);

        c
    }

    /// Processes a protocol event and returns the requests the connection
    /// must carry out, in order.
    pub fn on_event(
        &mut self, event: CongestionEvent, view: &TransportView,
    ) -> Actions {
        match event {
            CongestionEvent::NewAck(seq) => {
                self.on_new_ack(seq, view);
                Actions::new()
            },

            CongestionEvent::DupAck(count) => self.on_dup_ack(count, view),

            CongestionEvent::RetransmitTimeout =>
                self.on_retransmit_timeout(view),
        }
    }

    /// Processes an ACK that advanced the cumulative acknowledgment point to
    /// `acked_up_to`.
    pub fn on_new_ack(&mut self, acked_up_to: SeqNum, view: &TransportView) {
        self.bytes_in_flight = view.bytes_in_flight;
        self.new_acks += 1;

        trace!("{} new ack {}", self.trace_id, acked_up_to);

        self.cc.on_new_ack(&mut self.state, &self.trace_id);

        trace!("{} {:?}", self.trace_id, self);
    }

    /// Processes the `dup_ack_count`th consecutive duplicate ACK.
    pub fn on_dup_ack(
        &mut self, dup_ack_count: u32, view: &TransportView,
    ) -> Actions {
        self.bytes_in_flight = view.bytes_in_flight;

        let was_recovering = self.state.in_fast_recovery;

        let actions = self.cc.on_dup_ack(
            &mut self.state,
            dup_ack_count,
            view,
            &self.trace_id,
        );

        if !was_recovering && self.state.in_fast_recovery {
            self.fast_retransmits += 1;
        }

        trace!("{} {:?}", self.trace_id, self);

        actions
    }

    /// Processes a retransmission timer expiration.
    pub fn on_retransmit_timeout(&mut self, view: &TransportView) -> Actions {
        self.bytes_in_flight = view.bytes_in_flight;

        let actions = self.cc.on_retransmit_timeout(
            &mut self.state,
            view,
            &self.trace_id,
        );

        // An algorithm ignores a stale timer by requesting nothing.
        if actions.is_empty() {
            self.stale_timeouts += 1;
        } else {
            self.retransmit_timeouts += 1;
        }

        trace!("{} {:?}", self.trace_id, self);

        actions
    }

    /// Returns the current congestion window, in bytes.
    #[inline]
    pub fn cwnd(&self) -> usize {
        self.state.cwnd
    }

    /// Returns the current slow start threshold, in bytes.
    #[inline]
    pub fn ssthresh(&self) -> usize {
        self.state.ssthresh
    }

    /// Returns whether fast recovery is in progress.
    #[inline]
    pub fn in_fast_recovery(&self) -> bool {
        self.state.in_fast_recovery
    }

    /// Returns the slow start threshold the algorithm would pick after a
    /// loss at the current window. Does not modify any state.
    pub fn slow_start_threshold(&self) -> usize {
        self.cc.slow_start_threshold(&self.state)
    }

    /// Returns the congestion state.
    #[inline]
    pub fn state(&self) -> &TransportState {
        &self.state
    }

    /// Returns the name of the congestion control algorithm in use.
    #[inline]
    pub fn algorithm_name(&self) -> &'static str {
        self.cc.name()
    }

    /// Returns the log prefix of the connection.
    #[inline]
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Collects and returns congestion statistics.
    pub fn stats(&self) -> CongestionStats {
        CongestionStats {
            cwnd: self.state.cwnd,
            ssthresh: self.state.ssthresh,
            in_fast_recovery: self.state.in_fast_recovery,
            new_acks: self.new_acks,
            fast_retransmits: self.fast_retransmits,
            retransmit_timeouts: self.retransmit_timeouts,
            stale_timeouts: self.stale_timeouts,
        }
    }

    /// Returns a qlog `MetricsUpdated` event if any of the tracked metrics
    /// changed since the previous call.
    #[cfg(feature = "qlog")]
    pub fn maybe_qlog(&mut self) -> Option<EventData> {
        let qlog_metrics = QlogMetrics {
            cwnd: self.state.cwnd as u64,
            bytes_in_flight: self.bytes_in_flight as u64,
            ssthresh: self.state.ssthresh as u64,
        };

        self.qlog_metrics.maybe_update(qlog_metrics)
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "cc={} ", self.cc.name())?;
        write!(f, "cwnd={} ", self.state.cwnd)?;
        write!(f, "ssthresh={} ", self.state.ssthresh)?;
        write!(f, "bytes_in_flight={} ", self.bytes_in_flight)?;
        write!(f, "in_fast_recovery={} ", self.state.in_fast_recovery)?;
        write!(f, "mss={}", self.state.segment_size)?;

        Ok(())
    }
}

// Only the MetricsUpdated fields that changed since the last event are
// logged.
#[derive(Default)]
#[cfg(feature = "qlog")]
struct QlogMetrics {
    cwnd: u64,
    bytes_in_flight: u64,
    ssthresh: u64,
}

#[cfg(feature = "qlog")]
impl QlogMetrics {
    fn maybe_update(&mut self, latest: Self) -> Option<EventData> {
        let mut emit_event = false;

        let new_cwnd = if self.cwnd != latest.cwnd {
            self.cwnd = latest.cwnd;
            emit_event = true;
            Some(latest.cwnd)
        } else {
            None
        };

        let new_bytes_in_flight =
            if self.bytes_in_flight != latest.bytes_in_flight {
                self.bytes_in_flight = latest.bytes_in_flight;
                emit_event = true;
                Some(latest.bytes_in_flight)
            } else {
                None
            };

        let new_ssthresh = if self.ssthresh != latest.ssthresh {
            self.ssthresh = latest.ssthresh;
            emit_event = true;
            Some(latest.ssthresh)
        } else {
            None
        };

        if !emit_event {
            return None;
        }

        Some(EventData::MetricsUpdated(qlog::events::quic::MetricsUpdated {
            congestion_window: new_cwnd,
            bytes_in_flight: new_bytes_in_flight,
            ssthresh: new_ssthresh,
            ..Default::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::congestion::test_sender::TestSender;
    use crate::congestion::Action;
    use crate::state::ConnectionPhase;
    use crate::CongestionControlAlgorithm;

    #[test]
    fn init() {
        let mut config = Config::new(1460).unwrap();
        config.set_cc_algorithm(CongestionControlAlgorithm::Reno);
        config.set_initial_congestion_window_segments(4).unwrap();

        let c = Controller::new(&config, "conn");

        assert_eq!(c.cwnd(), 5840);
        assert_eq!(c.ssthresh(), 65535);
        assert!(!c.in_fast_recovery());
        assert_eq!(c.algorithm_name(), "Reno");
        assert_eq!(c.trace_id(), "conn");
        assert_eq!(c.stats(), CongestionStats {
            cwnd: 5840,
            ssthresh: 65535,
            ..Default::default()
        });
    }

    #[test]
    fn debug_summary() {
        let config = Config::new(1000).unwrap();
        let c = Controller::new(&config, "");

        assert_eq!(
            format!("{c:?}"),
            "cc=NewReno cwnd=1000 ssthresh=65535 bytes_in_flight=0 \
             in_fast_recovery=false mss=1000"
        );
    }

    #[test]
    fn event_dispatch() {
        let config = Config::new(1000).unwrap();
        let mut c = Controller::new(&config, "");

        let view = TransportView {
            bytes_in_flight: 8000,
            head_seq: SeqNum::new(1000),
            high_tx_mark: SeqNum::new(9000),
            phase: ConnectionPhase::Established,
            send_pending: false,
        };

        let actions = c.on_event(CongestionEvent::NewAck(SeqNum::new(1000)), &view);
        assert!(actions.is_empty());
        assert_eq!(c.cwnd(), 2000);

        let actions = c.on_event(CongestionEvent::DupAck(3), &view);
        assert_eq!(actions.as_slice(), &[Action::RetransmitOldestUnacked]);
        assert!(c.in_fast_recovery());

        let actions = c.on_event(CongestionEvent::RetransmitTimeout, &view);
        assert_eq!(actions.as_slice(), &[
            Action::ResumeSendingFrom(SeqNum::new(1000)),
            Action::RetransmitOldestUnacked,
        ]);
        assert_eq!(c.cwnd(), 1000);
        assert!(!c.in_fast_recovery());

        let stats = c.stats();
        assert_eq!(stats.new_acks, 1);
        assert_eq!(stats.fast_retransmits, 1);
        assert_eq!(stats.retransmit_timeouts, 1);
        assert_eq!(stats.stale_timeouts, 0);
    }

    #[test]
    fn stale_timeout_counted() {
        let mut sender = TestSender::new(CongestionControlAlgorithm::NewReno, 1000);

        let cwnd = sender.cwnd();

        // Nothing outstanding.
        assert!(sender.retransmit_timeout().is_empty());

        sender.phase = ConnectionPhase::Closed;
        sender.send_n_segments(2);
        assert!(sender.retransmit_timeout().is_empty());

        assert_eq!(sender.cwnd(), cwnd);
        assert_eq!(sender.stats().stale_timeouts, 2);
        assert_eq!(sender.stats().retransmit_timeouts, 0);
    }

    #[test]
    fn timeout_counters_follow_algorithm_decision() {
        let mut sender = TestSender::new(CongestionControlAlgorithm::Reno, 1000);

        // Data fully acknowledged, but the connection is closing and the FIN
        // may still be outstanding: the timeout is acted upon.
        sender.phase = ConnectionPhase::Closing;
        assert_eq!(sender.retransmit_timeout().len(), 2);

        sender.phase = ConnectionPhase::TimeWait;
        assert!(sender.retransmit_timeout().is_empty());

        sender.phase = ConnectionPhase::Established;
        sender.send_n_segments(1);
        assert_eq!(sender.retransmit_timeout().len(), 2);

        let stats = sender.stats();
        assert_eq!(stats.retransmit_timeouts, 2);
        assert_eq!(stats.stale_timeouts, 1);
    }

    #[test]
    fn slow_start_threshold_trace_point() {
        let config = Config::new(1000).unwrap();
        let mut c = Controller::new(&config, "");

        assert_eq!(c.slow_start_threshold(), 500);

        let view = TransportView {
            bytes_in_flight: 0,
            head_seq: SeqNum::new(1),
            high_tx_mark: SeqNum::new(1),
            phase: ConnectionPhase::Established,
            send_pending: false,
        };

        c.on_new_ack(SeqNum::new(1), &view);
        c.on_new_ack(SeqNum::new(1), &view);

        assert_eq!(c.cwnd(), 3000);
        assert_eq!(c.slow_start_threshold(), 1500);
        assert_eq!(c.ssthresh(), 65535);
    }

    #[cfg(feature = "qlog")]
    #[test]
    fn qlog_metrics_only_on_change() {
        let mut sender = TestSender::new(CongestionControlAlgorithm::Reno, 1000);

        let ev = sender.maybe_qlog();
        assert!(matches!(ev, Some(EventData::MetricsUpdated(_))));

        // Nothing changed.
        assert!(sender.maybe_qlog().is_none());

        sender.send_n_segments(1);
        sender.ack_n_segments(1);

        match sender.maybe_qlog() {
            Some(EventData::MetricsUpdated(m)) => {
                assert_eq!(m.congestion_window, Some(2000));
                assert_eq!(m.ssthresh, None);
            },

            _ => panic!("expected metrics update"),
        }
    }
}
