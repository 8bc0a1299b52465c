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

//! ACK-clocked window growth.
//!
//! Slow start adds one segment per new ACK; congestion avoidance adds
//! roughly one segment per round trip by spreading `segment_size^2 / cwnd`
//! over every ACK of the window (RFC 5681, section 3.1).

use crate::state::TransportState;

pub(super) fn on_new_ack(state: &mut TransportState, trace_id: &str) {
    // The first new ACK after fast retransmit ends fast recovery and
    // deflates the window back to ssthresh (RFC 5681, section 3.2).
    if state.in_fast_recovery {
        state.cwnd = state.ssthresh;
        state.in_fast_recovery = false;

        debug!(
            "{} fast recovery exit: cwnd={} ssthresh={}",
            trace_id, state.cwnd, state.ssthresh
        );

        // Some Reno stacks also apply congestion avoidance growth on this
        // ACK. Here cwnd stays exactly at ssthresh until the next one.
        return;
    }

    if state.in_slow_start() {
        state.cwnd += state.segment_size;

        trace!(
            "{} slow start: cwnd={} ssthresh={}",
            trace_id,
            state.cwnd,
            state.ssthresh
        );
    } else {
        state.cwnd += congestion_avoidance_increment(state);

        trace!(
            "{} congestion avoidance: cwnd={} ssthresh={}",
            trace_id,
            state.cwnd,
            state.ssthresh
        );
    }
}

fn congestion_avoidance_increment(state: &TransportState) -> usize {
    let mss = state.segment_size as f64;
    let adder = (mss * mss / state.cwnd as f64).max(1.0);

    adder as usize
}
