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

use crate::Config;

/// Per-connection congestion state.
///
/// The connection owns it; a congestion control algorithm borrows it mutably
/// for the duration of each event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportState {
    /// Congestion window, in bytes.
    pub cwnd: usize,

    /// Slow start threshold, in bytes. Never below 2.
    pub ssthresh: usize,

    /// Sender maximum segment size, in bytes.
    pub segment_size: usize,

    /// Number of duplicate ACKs that triggers fast retransmit.
    pub dup_ack_threshold: u32,

    /// Whether fast recovery is in progress.
    pub in_fast_recovery: bool,
}

impl TransportState {
    /// Creates the initial state of a connection.
    pub fn from_config(config: &Config) -> Self {
        TransportState {
            cwnd: config.initial_congestion_window(),
            ssthresh: config.initial_ssthresh,
            segment_size: config.segment_size,
            dup_ack_threshold: config.dup_ack_threshold,
            in_fast_recovery: false,
        }
    }

    /// Whether the next new ACK grows the window exponentially.
    pub fn in_slow_start(&self) -> bool {
        self.cwnd < self.ssthresh
    }
}

/// Coarse connection lifecycle, as far as loss recovery cares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// No connection, or fully closed.
    Closed,

    /// Handshake in progress (SYN-SENT, SYN-RECEIVED).
    Opening,

    /// Data transfer.
    Established,

    /// Close initiated by either side, FIN possibly unacknowledged
    /// (CLOSE-WAIT, FIN-WAIT-1/2, CLOSING, LAST-ACK).
    Closing,

    /// Waiting out 2MSL after close.
    TimeWait,
}

impl ConnectionPhase {
    /// A retransmission timer firing in this phase is always stale.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionPhase::Closed | ConnectionPhase::TimeWait)
    }

    /// Whether the connection has started closing. A closing connection may
    /// have a FIN outstanding beyond the data high-water mark.
    pub fn is_closing(self) -> bool {
        matches!(self, ConnectionPhase::Closing)
    }
}
