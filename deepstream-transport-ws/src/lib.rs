//! A [`deepstream_core::Transport`] backed by a real WebSocket connection.
//!
//! `deepstream-core` is synchronous and poll-driven on purpose (see its
//! `transport` module docs). This crate supplies the other half: a
//! background tokio task owns the actual socket and a pair of unbounded
//! channels ferries frames and lifecycle events across the sync/async
//! boundary, in the same connect-then-spawn shape
//! `services/forwarder/src/uplink.rs` uses for its own WebSocket session,
//! adapted from a single `async fn` call site to a channel so the core can
//! poll it from ordinary synchronous code.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use deepstream_core::{Transport, TransportEvent, TransportSendError, TransportState};
use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum WsTransportError {
    #[error("failed to connect: {0}")]
    Connect(String),
}

const STATE_CLOSED: u8 = 0;
const STATE_CONNECTING: u8 = 1;
const STATE_OPEN: u8 = 2;

fn to_transport_state(raw: u8) -> TransportState {
    match raw {
        STATE_OPEN => TransportState::Open,
        STATE_CONNECTING => TransportState::Connecting,
        _ => TransportState::Closed,
    }
}

/// A `Transport` whose socket runs on a background tokio task.
///
/// `open`/`close` spawn and tear down that task; `send`/`poll_events` are
/// ordinary non-async methods that talk to it over channels, so a
/// `ConnectionDriver<WsTransport>` can be driven entirely from synchronous
/// code (e.g. a plain loop calling `process_messages` on a timer) as long
/// as the tokio runtime `handle` stays alive.
pub struct WsTransport {
    handle: Handle,
    state: Arc<AtomicU8>,
    events_rx: Option<UnboundedReceiver<TransportEvent>>,
    outbound_tx: Option<UnboundedSender<Vec<u8>>>,
}

impl WsTransport {
    pub fn new(handle: Handle) -> Self {
        WsTransport { handle, state: Arc::new(AtomicU8::new(STATE_CLOSED)), events_rx: None, outbound_tx: None }
    }
}

impl Transport for WsTransport {
    fn state(&self) -> TransportState {
        to_transport_state(self.state.load(Ordering::Acquire))
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), TransportSendError> {
        let Some(tx) = &self.outbound_tx else { return Err(TransportSendError::NotOpen) };
        tx.send(frame.to_vec()).map_err(|_| TransportSendError::NotOpen)
    }

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        let Some(rx) = &mut self.events_rx else { return Vec::new() };
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn open(&mut self, url: &str) {
        let (events_tx, events_rx) = unbounded_channel::<TransportEvent>();
        let (outbound_tx, outbound_rx) = unbounded_channel::<Vec<u8>>();
        self.events_rx = Some(events_rx);
        self.outbound_tx = Some(outbound_tx);
        self.state.store(STATE_CONNECTING, Ordering::Release);

        let url = url.to_string();
        let state = self.state.clone();
        self.handle.spawn(run_session(url, state, events_tx, outbound_rx));
    }

    fn close(&mut self) {
        self.outbound_tx = None;
        self.state.store(STATE_CLOSED, Ordering::Release);
    }
}

async fn run_session(
    url: String,
    state: Arc<AtomicU8>,
    events_tx: UnboundedSender<TransportEvent>,
    mut outbound_rx: UnboundedReceiver<Vec<u8>>,
) {
    let (ws, _response) = match tokio_tungstenite::connect_async(&url).await {
        Ok(pair) => pair,
        Err(err) => {
            state.store(STATE_CLOSED, Ordering::Release);
            let _ = events_tx.send(TransportEvent::Error(WsTransportError::Connect(err.to_string()).to_string()));
            let _ = events_tx.send(TransportEvent::Closed);
            return;
        }
    };
    let (mut sink, mut stream) = ws.split();

    state.store(STATE_OPEN, Ordering::Release);
    let _ = events_tx.send(TransportEvent::Opened);

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(frame) => {
                        if let Err(err) = sink.send(WsMessage::Binary(frame)).await {
                            warn!(error = %err, "websocket send failed");
                            break;
                        }
                    }
                    None => {
                        let _ = sink.close().await;
                        break;
                    }
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(WsMessage::Binary(bytes))) => {
                        let _ = events_tx.send(TransportEvent::Message(bytes));
                    }
                    Some(Ok(WsMessage::Text(text))) => {
                        let _ = events_tx.send(TransportEvent::Message(text.into_bytes()));
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        debug!("websocket closed by peer");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Ping/Pong/Frame: handled transparently by tungstenite.
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "websocket read failed");
                        let _ = events_tx.send(TransportEvent::Error(err.to_string()));
                        break;
                    }
                }
            }
        }
    }

    state.store(STATE_CLOSED, Ordering::Release);
    let _ = events_tx.send(TransportEvent::Closed);
}
