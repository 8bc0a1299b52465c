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

//! TCP congestion control.
//!
//! tcpcc implements the loss-based Reno and NewReno congestion window
//! management of a TCP sender: slow start, congestion avoidance, fast
//! retransmit, fast recovery and the window collapse after a retransmission
//! timeout.
//!
//! It does not send or receive segments, estimate RTT, count duplicate ACKs
//! or run timers. The surrounding connection does all of that, and forwards
//! the resulting protocol events to a [`Controller`], which updates the
//! congestion state and answers with the [`Action`]s the connection should
//! take.
//!
//! ## Configuring a controller
//!
//! A [`Config`] holds the per-connection parameters:
//!
//! ```
//! let mut config = tcpcc::Config::new(1460)?;
//! config.set_cc_algorithm_name("reno")?;
//! config.set_initial_congestion_window_segments(2)?;
//!
//! let controller = tcpcc::Controller::new(&config, "conn-1");
//! assert_eq!(controller.cwnd(), 2920);
//! # Ok::<(), tcpcc::Error>(())
//! ```
//!
//! The `trace_id` passed to [`Controller::new()`] prefixes every log line the
//! controller emits for that connection.
//!
//! ## Delivering events
//!
//! Each ACK, duplicate ACK or timer expiration is delivered together with a
//! [`TransportView`] of the connection at that moment:
//!
//! ```
//! use tcpcc::Action;
//! use tcpcc::CongestionEvent;
//! use tcpcc::ConnectionPhase;
//! use tcpcc::SeqNum;
//! use tcpcc::TransportView;
//!
//! let config = tcpcc::Config::new(1000)?;
//! let mut controller = tcpcc::Controller::new(&config, "conn-1");
//!
//! let view = TransportView {
//!     bytes_in_flight: 8000,
//!     head_seq: SeqNum::new(1),
//!     high_tx_mark: SeqNum::new(8001),
//!     phase: ConnectionPhase::Established,
//!     send_pending: false,
//! };
//!
//! for count in 1..=3 {
//!     let actions = controller.on_event(CongestionEvent::DupAck(count), &view);
//!
//!     for action in actions {
//!         match action {
//!             Action::RetransmitOldestUnacked => (), // retransmit head
//!             Action::ResumeSendingFrom(_seq) => (), // rewind snd_nxt
//!             Action::SendPendingData => (),         // try to send
//!         }
//!     }
//! }
//!
//! assert!(controller.in_fast_recovery());
//! assert_eq!(controller.cwnd(), 7000);
//! # Ok::<(), tcpcc::Error>(())
//! ```
//!
//! Events for a connection must be delivered one at a time. Separate
//! connections share no state.

#![warn(missing_docs)]

#[macro_use]
extern crate log;

use std::str::FromStr;

/// The default sender maximum segment size, in bytes.
pub const DEFAULT_SEGMENT_SIZE: usize = 536;

/// The default number of duplicate ACKs that triggers fast retransmit.
pub const DEFAULT_DUP_ACK_THRESHOLD: u32 = 3;

/// The default initial congestion window, in segments.
pub const DEFAULT_INITIAL_CONGESTION_WINDOW_SEGMENTS: usize = 1;

/// The default initial slow start threshold, in bytes.
pub const DEFAULT_INITIAL_SSTHRESH: usize = 65535;

/// Stores configuration shared between multiple connections.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    cc_algorithm: CongestionControlAlgorithm,

    segment_size: usize,

    dup_ack_threshold: u32,

    initial_congestion_window_segments: usize,

    initial_ssthresh: usize,
}

impl Config {
    /// Creates a config object with the given sender maximum segment size,
    /// in bytes.
    ///
    /// Returns `Error::InvalidConfig` if `segment_size` is zero.
    ///
    /// ## Examples:
    ///
    /// ```
    /// let config = tcpcc::Config::new(1460)?;
    /// # Ok::<(), tcpcc::Error>(())
    /// ```
    pub fn new(segment_size: usize) -> Result<Config> {
        if segment_size == 0 {
            return Err(Error::InvalidConfig);
        }

        Ok(Config {
            cc_algorithm: CongestionControlAlgorithm::default(),
            segment_size,
            dup_ack_threshold: DEFAULT_DUP_ACK_THRESHOLD,
            initial_congestion_window_segments:
                DEFAULT_INITIAL_CONGESTION_WINDOW_SEGMENTS,
            initial_ssthresh: DEFAULT_INITIAL_SSTHRESH,
        })
    }

    /// Sets the congestion control algorithm used by string.
    ///
    /// The default value is `newreno`. On error `Error::CongestionControl`
    /// will be returned.
    ///
    /// ## Examples:
    ///
    /// ```
    /// # let mut config = tcpcc::Config::new(1460)?;
    /// config.set_cc_algorithm_name("reno");
    /// # Ok::<(), tcpcc::Error>(())
    /// ```
    pub fn set_cc_algorithm_name(&mut self, name: &str) -> Result<()> {
        self.cc_algorithm = CongestionControlAlgorithm::from_str(name)?;

        Ok(())
    }

    /// Sets the congestion control algorithm used.
    ///
    /// The default value is `CongestionControlAlgorithm::NewReno`.
    pub fn set_cc_algorithm(&mut self, algo: CongestionControlAlgorithm) {
        self.cc_algorithm = algo;
    }

    /// Sets the number of duplicate ACKs that triggers fast retransmit.
    ///
    /// The default value is `3`. Returns `Error::InvalidConfig` for zero.
    pub fn set_dup_ack_threshold(&mut self, v: u32) -> Result<()> {
        if v == 0 {
            return Err(Error::InvalidConfig);
        }

        self.dup_ack_threshold = v;

        Ok(())
    }

    /// Sets the initial congestion window, in segments.
    ///
    /// The default value is `1`. Returns `Error::InvalidConfig` for zero, or
    /// when the resulting window in bytes does not fit in a `usize`.
    pub fn set_initial_congestion_window_segments(
        &mut self, segments: usize,
    ) -> Result<()> {
        if segments == 0 {
            return Err(Error::InvalidConfig);
        }

        if self.segment_size.checked_mul(segments).is_none() {
            return Err(Error::InvalidConfig);
        }

        self.initial_congestion_window_segments = segments;

        Ok(())
    }

    /// Sets the initial slow start threshold, in bytes.
    ///
    /// The default value is `65535`. Returns `Error::InvalidConfig` for
    /// values below 2.
    pub fn set_initial_ssthresh(&mut self, v: usize) -> Result<()> {
        if v < congestion::MINIMUM_SSTHRESH {
            return Err(Error::InvalidConfig);
        }

        self.initial_ssthresh = v;

        Ok(())
    }

    /// Returns the configured congestion control algorithm.
    #[inline]
    pub fn cc_algorithm(&self) -> CongestionControlAlgorithm {
        self.cc_algorithm
    }

    /// Returns the sender maximum segment size, in bytes.
    #[inline]
    pub fn segment_size(&self) -> usize {
        self.segment_size
    }

    /// Returns the duplicate ACK threshold.
    #[inline]
    pub fn dup_ack_threshold(&self) -> u32 {
        self.dup_ack_threshold
    }

    /// Returns the initial congestion window, in bytes.
    ///
    /// Cannot overflow, the setter rejects such segment counts.
    #[inline]
    pub fn initial_congestion_window(&self) -> usize {
        self.segment_size * self.initial_congestion_window_segments
    }

    /// Returns the initial slow start threshold, in bytes.
    #[inline]
    pub fn initial_ssthresh(&self) -> usize {
        self.initial_ssthresh
    }
}

pub use crate::congestion::Action;
pub use crate::congestion::Actions;
pub use crate::congestion::CongestionAlgorithm;
pub use crate::congestion::CongestionControl;
pub use crate::congestion::CongestionControlAlgorithm;
pub use crate::congestion::CongestionEvent;
pub use crate::congestion::NewReno;
pub use crate::congestion::Reno;
pub use crate::congestion::TransportView;
pub use crate::controller::CongestionStats;
pub use crate::controller::Controller;
pub use crate::error::Error;
pub use crate::error::Result;
pub use crate::seq::SeqNum;
pub use crate::settings::CongestionSettings;
pub use crate::state::ConnectionPhase;
pub use crate::state::TransportState;

pub mod congestion;
mod controller;
mod error;
mod seq;
mod settings;
mod state;
