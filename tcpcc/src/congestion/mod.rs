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

//! Loss-based congestion control.
//!
//! Window growth (slow start and congestion avoidance) lives in [`growth`],
//! fast retransmit, fast recovery and timeout handling in [`loss`]. The
//! [`CongestionControl`] trait bundles both behind one interface and
//! [`CongestionAlgorithm`] dispatches to the configured variant.

use std::cmp;
use std::fmt::Debug;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::seq::SeqNum;
use crate::state::ConnectionPhase;
use crate::state::TransportState;

mod growth;
mod loss;
mod new_reno;
mod reno;

#[cfg(test)]
pub(crate) mod test_sender;

pub use self::new_reno::NewReno;
pub use self::reno::Reno;

/// Lower bound of the slow start threshold, in bytes.
pub const MINIMUM_SSTHRESH: usize = 2;

/// Available congestion control algorithms.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub enum CongestionControlAlgorithm {
    /// Reno congestion control algorithm. `reno` in a string form.
    Reno    = 0,
    /// NewReno congestion control algorithm (default). `newreno` in a string
    /// form.
    #[default]
    NewReno = 1,
}

impl FromStr for CongestionControlAlgorithm {
    type Err = crate::Error;

    /// Converts a string to `CongestionControlAlgorithm`.
    ///
    /// Matching is case-insensitive. If `name` is not valid,
    /// `Error::CongestionControl` is returned.
    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "reno" => Ok(CongestionControlAlgorithm::Reno),
            "newreno" | "new_reno" => Ok(CongestionControlAlgorithm::NewReno),

            _ => Err(crate::Error::CongestionControl),
        }
    }
}

impl std::fmt::Display for CongestionControlAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let cc: CongestionAlgorithm = (*self).into();

        f.write_str(cc.name())
    }
}

/// A protocol event delivered by the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CongestionEvent {
    /// An ACK advanced the cumulative acknowledgment point up to the given
    /// sequence number.
    NewAck(SeqNum),

    /// A duplicate ACK arrived. Carries the number of consecutive duplicates
    /// seen so far, including this one.
    DupAck(u32),

    /// The retransmission timer fired.
    RetransmitTimeout,
}

/// A request from the congestion controller to the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Retransmit the oldest unacknowledged segment.
    RetransmitOldestUnacked,

    /// Rewind the next transmit sequence number to the given value.
    ResumeSendingFrom(SeqNum),

    /// Try to send pending data, the window may have opened.
    SendPendingData,
}

/// Requests produced by a single event, in the order they must be honored.
pub type Actions = SmallVec<[Action; 2]>;

/// Connection state the congestion controller needs to see for an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportView {
    /// Bytes sent but not yet acknowledged.
    pub bytes_in_flight: usize,

    /// Oldest unacknowledged sequence number (the cumulative ACK point).
    pub head_seq: SeqNum,

    /// Highest sequence number transmitted so far.
    pub high_tx_mark: SeqNum,

    /// Lifecycle phase of the connection.
    pub phase: ConnectionPhase,

    /// Whether a send-pending-data task is already scheduled.
    pub send_pending: bool,
}

/// A congestion control algorithm instance, selected once per connection.
#[enum_dispatch::enum_dispatch(CongestionControl)]
#[derive(Debug)]
pub enum CongestionAlgorithm {
    /// See [`Reno`].
    Reno(Reno),
    /// See [`NewReno`].
    NewReno(NewReno),
}

impl From<CongestionControlAlgorithm> for CongestionAlgorithm {
    fn from(algo: CongestionControlAlgorithm) -> Self {
        match algo {
            CongestionControlAlgorithm::Reno => Reno::default().into(),
            CongestionControlAlgorithm::NewReno => NewReno::default().into(),
        }
    }
}

/// A loss-based congestion control algorithm.
///
/// Every method runs synchronously and to completion. The connection must
/// serialize calls for a given [`TransportState`].
#[enum_dispatch::enum_dispatch]
pub trait CongestionControl: Debug {
    /// Returns the name used in diagnostics and configuration.
    fn name(&self) -> &'static str;

    /// Returns the slow start threshold to use after a loss, given the
    /// current state: half the congestion window, but never below
    /// [`MINIMUM_SSTHRESH`].
    fn slow_start_threshold(&self, state: &TransportState) -> usize {
        cmp::max(state.cwnd >> 1, MINIMUM_SSTHRESH)
    }

    /// Called for an ACK that advances the cumulative acknowledgment point.
    fn on_new_ack(&mut self, state: &mut TransportState, trace_id: &str) {
        growth::on_new_ack(state, trace_id);
    }

    /// Called for each duplicate ACK. `dup_ack_count` counts consecutive
    /// duplicates including this one.
    fn on_dup_ack(
        &mut self, state: &mut TransportState, dup_ack_count: u32,
        view: &TransportView, trace_id: &str,
    ) -> Actions {
        loss::on_dup_ack(state, dup_ack_count, view, trace_id)
    }

    /// Called when the retransmission timer fires.
    fn on_retransmit_timeout(
        &mut self, state: &mut TransportState, view: &TransportView,
        trace_id: &str,
    ) -> Actions {
        loss::on_retransmit_timeout(state, view, trace_id)
    }
}
