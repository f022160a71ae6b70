//! Connection driver (C7): owns the transport, the handshake state, and the
//! event/presence coordinators, and is the crate's single entry point.
//!
//! Grounded in `examples/original_source/src/core/connection.cpp`. Three
//! behaviors are carried over deliberately because the distilled contract
//! left them ambiguous:
//! - `login` is a no-op (immediate success) if the connection is already
//!   `Open`.
//! - a successful open resets the reconnection attempt counter to zero.
//! - reconnection gives up after three attempts, matching the original's
//!   hardcoded cap.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{ErrorChannel, ProgrammerError, TracingErrorChannel};
use crate::event::{EventCoordinator, SubscriptionIdAllocator};
use crate::fsm::{transition_incoming, transition_outgoing, ConnectionState, TransitionEffect};
use crate::message::{Action, Header, Message, Topic};
use crate::message_builder::MessageBuilder;
use crate::parser::parse;
use crate::presence::PresenceCoordinator;
use crate::transport::{Transport, TransportEvent};

const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 3;
const DEFAULT_MAX_REDIRECTS: u32 = 3;

/// User-facing configuration. Grounded in the raw/validated config split of
/// `services/forwarder/src/config.rs`, minus the file-loading half: this
/// crate has no filesystem of its own, so callers build a `ClientOptions`
/// directly rather than deserializing one from TOML.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub url: String,
    pub reconnect_interval: Duration,
    pub max_reconnect_attempts: u32,
    pub max_redirects: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            url: String::new(),
            reconnect_interval: Duration::from_millis(500),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailure {
    InvalidAuthData,
    InvalidAuthMsg,
    TooManyAttempts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginResult {
    Success,
    Failure(LoginFailure),
}

type LoginCallback = Box<dyn FnOnce(LoginResult)>;

pub struct ConnectionDriver<T: Transport> {
    transport: T,
    url: String,
    options: ClientOptions,
    state: ConnectionState,
    reconnection_attempt: u32,
    redirect_count: u32,
    user_closed: bool,
    auth_params: Option<Vec<u8>>,
    pending_login: Option<LoginCallback>,
    error_channel: Box<dyn ErrorChannel>,
    pub event: EventCoordinator,
    pub presence: PresenceCoordinator,
}

impl<T: Transport> ConnectionDriver<T> {
    pub fn new(transport: T, options: ClientOptions) -> Self {
        let ids = SubscriptionIdAllocator::new();
        let url = options.url.clone();
        ConnectionDriver {
            transport,
            url,
            options,
            state: ConnectionState::Closed,
            reconnection_attempt: 0,
            redirect_count: 0,
            user_closed: false,
            auth_params: None,
            pending_login: None,
            error_channel: Box::new(TracingErrorChannel),
            event: EventCoordinator::new(ids.clone()),
            presence: PresenceCoordinator::new(ids),
        }
    }

    pub fn with_error_channel(mut self, channel: impl ErrorChannel + 'static) -> Self {
        self.error_channel = Box::new(channel);
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Direct access to the underlying transport, mainly useful for tests
    /// and diagnostics that need to inspect or drive it beyond what the
    /// driver's own API exposes.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Open the socket and begin the handshake.
    pub fn connect(&mut self) {
        info!(url = %self.url, "connecting");
        self.user_closed = false;
        self.state = ConnectionState::AwaitConnection;
        let url = self.url.clone();
        self.transport.open(&url);
    }

    pub fn close(&mut self) {
        debug!("closing connection at user request");
        self.user_closed = true;
        self.state = ConnectionState::Closed;
        self.transport.close();
    }

    /// Authenticate. A no-op (immediate `Success`) if already `Open`,
    /// matching the original's guard against redundant login calls.
    pub fn login(&mut self, auth_params: Vec<u8>, callback: impl FnOnce(LoginResult) + 'static) {
        if self.state == ConnectionState::Open {
            callback(LoginResult::Success);
            return;
        }
        self.auth_params = Some(auth_params);
        self.pending_login = Some(Box::new(callback));
        if self.state == ConnectionState::AwaitAuthentication {
            self.send_auth_request();
        }
    }

    fn send_auth_request(&mut self) {
        let Some(params) = self.auth_params.clone() else { return };
        let Some(next) = transition_outgoing(self.state, Header::new(Topic::Auth, Action::Request, false)) else {
            return;
        };
        let mut builder = MessageBuilder::new(Header::new(Topic::Auth, Action::Request, false));
        let _ = builder.add_argument(&params);
        let _ = self.transport.send(&builder.execute());
        self.state = next;
    }

    /// Send an application message, subject to the current handshake stage.
    /// Connection- and auth-topic messages are checked against the
    /// handshake state itself; every other topic additionally requires a
    /// fully `Open` connection.
    pub fn send(&mut self, header: Header, args: &[&[u8]]) -> Result<(), ProgrammerError> {
        let Some(next) = transition_outgoing(self.state, header) else {
            return Err(ProgrammerError::InvalidOutgoingTransition(header.human_str()));
        };
        let mut builder = MessageBuilder::new(header);
        for arg in args {
            let _ = builder.add_argument(arg);
        }
        let _ = self.transport.send(&builder.execute());
        self.state = next;
        Ok(())
    }

    /// Drain and process everything the transport has observed since the
    /// last call. The crate's only re-entry point from an external event
    /// loop; single-threaded and synchronous by construction.
    pub fn process_messages(&mut self) {
        let events = self.transport.poll_events();
        for event in events {
            match event {
                TransportEvent::Opened => self.on_transport_opened(),
                TransportEvent::Closed => self.on_transport_closed(),
                TransportEvent::Error(message) => self.error_channel.on_error(&message),
                TransportEvent::Message(bytes) => self.on_bytes(&bytes),
            }
        }
    }

    fn on_bytes(&mut self, bytes: &[u8]) {
        let (messages, errors) = parse(bytes);
        for error in &errors {
            self.error_channel.on_error(&error.to_string());
        }
        for message in &messages {
            match (message.topic(), message.action(), message.is_ack()) {
                (Topic::Connection, Action::Ping, false) => {
                    let _ = self.transport.send(&MessageBuilder::new(Header::new(Topic::Connection, Action::Pong, false)).execute());
                }
                (Topic::Event, ..) => self.event.notify(message, &mut self.transport),
                (Topic::Presence, ..) => self.presence.notify(message),
                (Topic::Connection | Topic::Auth, ..) => self.handle_handshake_message(message),
                _ => {}
            }
        }
    }

    fn handle_handshake_message(&mut self, message: &Message<'_>) {
        let Some(transition) = transition_incoming(self.state, message.header()) else {
            self.error_channel.on_error(&format!(
                "state-machine error: unexpected message {} while in state {:?}",
                message.header().human_str(),
                self.state
            ));
            self.state = ConnectionState::Error;
            self.transport.close();
            return;
        };
        debug!(from = ?self.state, to = ?transition.state, header = message.header().human_str(), "handshake transition");
        self.state = transition.state;
        match transition.effect {
            TransitionEffect::SendChallengeResponse => {
                let Some(next) =
                    transition_outgoing(self.state, Header::new(Topic::Connection, Action::ChallengeResponse, false))
                else {
                    return;
                };
                let mut builder =
                    MessageBuilder::new(Header::new(Topic::Connection, Action::ChallengeResponse, false));
                let _ = builder.add_argument(&self.url);
                let _ = self.transport.send(&builder.execute());
                self.state = next;
            }
            TransitionEffect::FollowRedirect => {
                self.redirect_count += 1;
                if self.redirect_count > self.options.max_redirects {
                    self.error_channel.on_error("too many redirections");
                    self.state = ConnectionState::Error;
                    self.transport.close();
                    return;
                }
                if let Some(new_url) = message.argument(0) {
                    self.url = String::from_utf8_lossy(new_url).into_owned();
                }
                self.transport.close();
                self.transport.open(&self.url.clone());
            }
            TransitionEffect::NotifyLoginSuccess => {
                self.event.on_reconnected(&mut self.transport);
                if let Some(cb) = self.pending_login.take() {
                    cb(LoginResult::Success);
                }
            }
            TransitionEffect::NotifyLoginFailure => {
                let failure = match message.action() {
                    Action::ErrorInvalidAuthMsg => LoginFailure::InvalidAuthMsg,
                    Action::ErrorTooManyAuthAttempts => LoginFailure::TooManyAttempts,
                    _ => LoginFailure::InvalidAuthData,
                };
                let fatal = failure != LoginFailure::InvalidAuthData;
                if fatal {
                    self.transport.close();
                }
                if let Some(cb) = self.pending_login.take() {
                    cb(LoginResult::Failure(failure));
                } else {
                    self.error_channel.on_error("login failed with no pending callback");
                }
            }
            TransitionEffect::None => {}
        }
        if self.state == ConnectionState::AwaitAuthentication && self.auth_params.is_some() {
            self.send_auth_request();
        }
    }

    /// Subscribe to an event name. Forwards to the event coordinator with
    /// this driver's transport; see [`EventCoordinator::subscribe`].
    pub fn subscribe(&mut self, name: &str, callback: impl FnMut(&[u8]) + 'static) -> crate::event::SubscriptionId {
        self.event.subscribe(name, callback, &mut self.transport)
    }

    pub fn unsubscribe(&mut self, name: &str) {
        self.event.unsubscribe(name, &mut self.transport);
    }

    pub fn unsubscribe_one(&mut self, name: &str, id: crate::event::SubscriptionId) {
        self.event.unsubscribe_one(name, id, &mut self.transport);
    }

    pub fn emit(&mut self, name: &str, data: &[u8]) {
        self.event.emit(name, data, &mut self.transport);
    }

    pub fn listen(&mut self, pattern: &str, callback: impl FnMut(&str) -> bool + 'static) {
        self.event.listen(pattern, callback, &mut self.transport);
    }

    pub fn unlisten(&mut self, pattern: &str) {
        self.event.unlisten(pattern, &mut self.transport);
    }

    pub fn presence_subscribe(&mut self, callback: impl FnMut(&str, bool) + 'static) -> crate::event::SubscriptionId {
        self.presence.subscribe(callback, &mut self.transport)
    }

    pub fn presence_unsubscribe(&mut self, id: crate::event::SubscriptionId) {
        self.presence.unsubscribe(id, &mut self.transport);
    }

    pub fn presence_unsubscribe_all(&mut self) {
        self.presence.unsubscribe_all(&mut self.transport);
    }

    pub fn get_all(&mut self, callback: impl FnOnce(&[String]) + 'static) {
        self.presence.get_all(callback, &mut self.transport);
    }

    fn on_transport_opened(&mut self) {
        info!(url = %self.url, "transport opened");
        self.reconnection_attempt = 0;
        self.redirect_count = 0;
        self.state = ConnectionState::AwaitConnection;
    }

    fn on_transport_closed(&mut self) {
        if self.user_closed || self.state == ConnectionState::Error || self.state == ConnectionState::Closed {
            return;
        }
        if self.reconnection_attempt >= self.options.max_reconnect_attempts {
            self.state = ConnectionState::Closed;
            self.error_channel.on_error("sudden disconnect: giving up after maximum reconnection attempts");
            return;
        }
        self.reconnection_attempt += 1;
        warn!(attempt = self.reconnection_attempt, max = self.options.max_reconnect_attempts, "reconnecting");
        self.state = ConnectionState::Reconnecting;
        let url = self.url.clone();
        self.transport.open(&url);
    }

    /// Force the handshake state directly, bypassing the transition
    /// tables. Exists for tests that need to exercise a state without
    /// replaying the whole handshake that leads to it.
    #[doc(hidden)]
    pub fn force_state(&mut self, state: ConnectionState) {
        self.state = state;
    }
}
