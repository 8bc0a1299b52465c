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

//! Fast retransmit, fast recovery and retransmission timeout handling
//! (RFC 5681, sections 3.1 and 3.2).

use std::cmp;

use smallvec::smallvec;

use crate::state::TransportState;

use super::Action;
use super::Actions;
use super::TransportView;

pub(super) fn on_dup_ack(
    state: &mut TransportState, dup_ack_count: u32, view: &TransportView,
    trace_id: &str,
) -> Actions {
    if dup_ack_count == state.dup_ack_threshold && !state.in_fast_recovery {
        state.ssthresh = loss_ssthresh(state, view.bytes_in_flight);

        // Inflate by the segments that left the network to generate the
        // duplicate ACKs.
        state.cwnd = state.ssthresh +
            state.dup_ack_threshold as usize * state.segment_size;

        state.in_fast_recovery = true;

        debug!(
            "{} fast retransmit: dup_acks={} cwnd={} ssthresh={}",
            trace_id, dup_ack_count, state.cwnd, state.ssthresh
        );

        return smallvec![Action::RetransmitOldestUnacked];
    }

    if state.in_fast_recovery {
        state.cwnd += state.segment_size;

        trace!(
            "{} fast recovery inflate: dup_acks={} cwnd={}",
            trace_id,
            dup_ack_count,
            state.cwnd
        );

        if !view.send_pending {
            return smallvec![Action::SendPendingData];
        }
    }

    Actions::new()
}

pub(super) fn on_retransmit_timeout(
    state: &mut TransportState, view: &TransportView, trace_id: &str,
) -> Actions {
    if is_stale_timeout(view) {
        debug!(
            "{} ignoring stale retransmission timeout: phase={:?} head={} high_tx={}",
            trace_id, view.phase, view.head_seq, view.high_tx_mark
        );

        return Actions::new();
    }

    state.in_fast_recovery = false;
    state.ssthresh = loss_ssthresh(state, view.bytes_in_flight);
    state.cwnd = state.segment_size;

    debug!(
        "{} retransmission timeout: cwnd={} ssthresh={} resume_from={}",
        trace_id, state.cwnd, state.ssthresh, view.head_seq
    );

    smallvec![
        Action::ResumeSendingFrom(view.head_seq),
        Action::RetransmitOldestUnacked,
    ]
}

pub(super) fn is_stale_timeout(view: &TransportView) -> bool {
    if view.phase.is_terminal() {
        return true;
    }

    // Everything sent has been acknowledged. A closing connection skips this
    // check since its FIN may still be outstanding.
    !view.phase.is_closing() && view.head_seq >= view.high_tx_mark
}

// ssthresh = max(FlightSize / 2, 2 * SMSS)
fn loss_ssthresh(state: &TransportState, bytes_in_flight: usize) -> usize {
    cmp::max(2 * state.segment_size, bytes_in_flight / 2)
}
