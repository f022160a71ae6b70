//! Synchronous core of a deepstream realtime protocol client: wire framing,
//! a recoverable parser, the connection handshake/reconnect state machine,
//! and event/presence pub-sub coordination.
//!
//! The crate never owns a socket or a background thread; see
//! [`transport::Transport`] for the boundary an application or a transport
//! adapter crate (e.g. `deepstream-transport-ws`) implements.

pub mod buffer;
pub mod connection;
pub mod error;
pub mod event;
pub mod fsm;
pub mod message;
pub mod message_builder;
pub mod parser;
pub mod presence;
pub mod scanner;
pub mod transport;
pub mod type_serializer;

pub use buffer::Buffer;
pub use connection::{ClientOptions, ConnectionDriver, LoginFailure, LoginResult};
pub use error::{BuilderError, ErrorChannel, ParseError, ProgrammerError, RecordingErrorChannel, TracingErrorChannel};
pub use event::{EventCoordinator, SubscriptionId, SubscriptionIdAllocator};
pub use fsm::{transition_incoming, transition_outgoing, ConnectionState};
pub use message::{Action, Header, Message, Topic};
pub use message_builder::MessageBuilder;
pub use parser::parse;
pub use presence::PresenceCoordinator;
pub use transport::{Transport, TransportEvent, TransportSendError, TransportState};
