//! Transport boundary (C11).
//!
//! The core never owns a socket or a thread. Instead it polls a
//! [`Transport`] for events, synchronously, from inside `process_messages`.
//! This replaces the callback-registration websocket interface of
//! `examples/original_source/include/deepstream/core/ws.hpp`: a
//! callback-based interface would require the core to hand out `&mut self`
//! (or an `Rc<RefCell<_>>`) to an external event loop, which is exactly the
//! cyclic-ownership shape Rust makes awkward on purpose. A poll-based
//! interface keeps the core single-threaded and synchronous while still
//! letting a real adapter (see `deepstream-transport-ws`) run a background
//! task and hand events back across a channel.

/// The transport's own connection lifecycle, independent of the deepstream
/// handshake state layered on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Connecting,
    Open,
    Closed,
}

/// One event a transport can report since the last poll.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Opened,
    Message(Vec<u8>),
    Closed,
    Error(String),
}

/// The core's entire view of the network. `poll_events` must never block:
/// an adapter backed by a background thread or async task buffers events
/// internally and drains them here.
pub trait Transport {
    fn state(&self) -> TransportState;

    /// Send a complete binary frame. Implementations that cannot send
    /// immediately (socket not yet open) should report failure rather than
    /// buffering silently, so callers can decide whether to queue.
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportSendError>;

    /// Drain all events observed since the last call. Must return quickly;
    /// an empty vec means nothing new happened.
    fn poll_events(&mut self) -> Vec<TransportEvent>;

    /// Begin connecting (or reconnecting) to `url`.
    fn open(&mut self, url: &str);

    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransportSendError {
    #[error("transport is not open")]
    NotOpen,
}
