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

use std::ops::Deref;
use std::ops::DerefMut;

use crate::congestion::Action;
use crate::congestion::Actions;
use crate::congestion::CongestionEvent;
use crate::congestion::TransportView;
use crate::controller::Controller;
use crate::seq::SeqNum;
use crate::state::ConnectionPhase;
use crate::CongestionControlAlgorithm;
use crate::Config;

/// Drives a [`Controller`] the way a connection would, tracking sequence
/// numbers, bytes in flight and duplicate ACK counts.
pub(crate) struct TestSender {
    cc: Controller,
    pub(crate) segment_size: usize,
    pub(crate) head_seq: SeqNum,
    pub(crate) high_tx_mark: SeqNum,
    pub(crate) bytes_in_flight: usize,
    pub(crate) dup_acks: u32,
    pub(crate) phase: ConnectionPhase,
    pub(crate) send_pending: bool,
    pub(crate) actions: Vec<Action>,
}

impl TestSender {
    pub(crate) fn new(algo: CongestionControlAlgorithm, mss: usize) -> Self {
        let mut cfg = Config::new(mss).unwrap();
        cfg.set_cc_algorithm(algo);

        Self::with_config(&cfg)
    }

    pub(crate) fn with_config(cfg: &Config) -> Self {
        let isn = SeqNum::new(1);

        TestSender {
            cc: Controller::new(cfg, "test"),
            segment_size: cfg.segment_size(),
            head_seq: isn,
            high_tx_mark: isn,
            bytes_in_flight: 0,
            dup_acks: 0,
            phase: ConnectionPhase::Established,
            send_pending: false,
            actions: Vec::new(),
        }
    }

    /// Starts the sequence space at `isn`.
    pub(crate) fn with_isn(mut self, isn: u32) -> Self {
        self.head_seq = SeqNum::new(isn);
        self.high_tx_mark = SeqNum::new(isn);
        self
    }

    pub(crate) fn view(&self) -> TransportView {
        TransportView {
            bytes_in_flight: self.bytes_in_flight,
            head_seq: self.head_seq,
            high_tx_mark: self.high_tx_mark,
            phase: self.phase,
            send_pending: self.send_pending,
        }
    }

    pub(crate) fn send_n_segments(&mut self, n: usize) {
        let bytes = n * self.segment_size;

        self.high_tx_mark = self.high_tx_mark + bytes as u32;
        self.bytes_in_flight += bytes;
    }

    /// Sends as many full segments as the congestion window allows.
    pub(crate) fn fill_window(&mut self) -> usize {
        let room = self.cc.cwnd().saturating_sub(self.bytes_in_flight);
        let n = room / self.segment_size;

        self.send_n_segments(n);

        n
    }

    /// Acknowledges the oldest `n` outstanding segments, one ACK each.
    pub(crate) fn ack_n_segments(&mut self, n: usize) {
        for _ in 0..n {
            self.head_seq = self.head_seq + self.segment_size as u32;
            self.bytes_in_flight =
                self.bytes_in_flight.saturating_sub(self.segment_size);
            self.dup_acks = 0;

            self.deliver(CongestionEvent::NewAck(self.head_seq));
        }
    }

    /// Delivers `n` duplicate ACKs for the current head.
    pub(crate) fn dup_ack_n(&mut self, n: u32) -> Actions {
        let mut all = Actions::new();

        for _ in 0..n {
            self.dup_acks += 1;

            all.extend(self.deliver(CongestionEvent::DupAck(self.dup_acks)));
        }

        all
    }

    pub(crate) fn retransmit_timeout(&mut self) -> Actions {
        self.deliver(CongestionEvent::RetransmitTimeout)
    }

    fn deliver(&mut self, event: CongestionEvent) -> Actions {
        let view = self.view();
        let actions = self.cc.on_event(event, &view);

        self.actions.extend(actions.iter().copied());

        actions
    }

    pub(crate) fn retransmits_requested(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| **a == Action::RetransmitOldestUnacked)
            .count()
    }
}

impl Deref for TestSender {
    type Target = Controller;

    fn deref(&self) -> &Self::Target {
        &self.cc
    }
}

impl DerefMut for TestSender {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.cc
    }
}
