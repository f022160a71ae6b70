//! A fully in-memory [`Transport`] double for integration tests.
//!
//! Grounded in `examples/original_source/src/core/test/pseudo-websocket.{cpp,hpp}`'s
//! `PseudoWSHandler`, which stands in for a real socket in the original's
//! own test suite. The original is a bare stub (every method is a no-op);
//! this version is fleshed out into something a test can actually drive —
//! queue inbound frames, inspect what was sent, flip open/closed — while
//! keeping the same role: a transport a test controls by hand instead of a
//! real network.

#![allow(dead_code)]

use deepstream_core::{Transport, TransportEvent, TransportSendError, TransportState};

pub struct PseudoTransport {
    pub sent: Vec<Vec<u8>>,
    pub opened_urls: Vec<String>,
    state: TransportState,
    inbound: Vec<TransportEvent>,
    pub fail_sends: bool,
}

impl PseudoTransport {
    pub fn new() -> Self {
        PseudoTransport {
            sent: Vec::new(),
            opened_urls: Vec::new(),
            state: TransportState::Closed,
            inbound: Vec::new(),
            fail_sends: false,
        }
    }

    /// Queue an inbound human-readable frame (`|`/`+` syntax) to be
    /// delivered on the next `process_messages` call.
    pub fn deliver(&mut self, human: &str) {
        self.inbound.push(TransportEvent::Message(deepstream_core::message::from_human_readable(human)));
    }

    pub fn deliver_opened(&mut self) {
        self.state = TransportState::Open;
        self.inbound.push(TransportEvent::Opened);
    }

    pub fn deliver_closed(&mut self) {
        self.state = TransportState::Closed;
        self.inbound.push(TransportEvent::Closed);
    }

    /// Every frame sent so far, rendered human-readable, in order.
    pub fn sent_human(&self) -> Vec<String> {
        self.sent.iter().map(|f| deepstream_core::message::to_human_readable(f)).collect()
    }
}

impl Default for PseudoTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for PseudoTransport {
    fn state(&self) -> TransportState {
        self.state
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), TransportSendError> {
        if self.fail_sends || self.state != TransportState::Open {
            return Err(TransportSendError::NotOpen);
        }
        self.sent.push(frame.to_vec());
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        std::mem::take(&mut self.inbound)
    }

    fn open(&mut self, url: &str) {
        self.opened_urls.push(url.to_string());
        self.state = TransportState::Open;
        self.inbound.push(TransportEvent::Opened);
    }

    fn close(&mut self) {
        self.state = TransportState::Closed;
    }
}
