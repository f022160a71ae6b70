//! The error channel interface (C10) and recoverable error taxonomies.
//!
//! Grounded in `examples/original_source/include/deepstream/core/error_handler.hpp`
//! (the `ErrorHandler` interface and `ErrorState` enum) and the thiserror
//! style `services/receiver/src/session.rs` uses for its own error enum.

use std::fmt;

/// A single recoverable sink for anomalies observed anywhere in the core.
/// Concrete sinks (stderr, a log file, a metrics counter) are external
/// collaborators; this trait is the only thing the core depends on.
pub trait ErrorChannel {
    fn on_error(&mut self, message: &str);
}

/// An [`ErrorChannel`] that forwards to `tracing::warn!`. Useful as a
/// default when the application doesn't need its own sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorChannel;

impl ErrorChannel for TracingErrorChannel {
    fn on_error(&mut self, message: &str) {
        tracing::warn!(target: "deepstream_core", "{message}");
    }
}

/// An [`ErrorChannel`] that records every message, for tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingErrorChannel {
    pub messages: Vec<String>,
}

impl ErrorChannel for RecordingErrorChannel {
    fn on_error(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

/// A parser error, localised to a byte range of the frame that produced it.
/// Recoverable: the parser resumes scanning after reporting one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    UnexpectedToken { offset: usize, length: usize },
    UnexpectedEof { offset: usize, length: usize },
    CorruptPayload { offset: usize, length: usize },
    InvalidNumberOfArguments { offset: usize, length: usize },
}

impl ParseError {
    pub fn offset(&self) -> usize {
        match self {
            ParseError::UnexpectedToken { offset, .. }
            | ParseError::UnexpectedEof { offset, .. }
            | ParseError::CorruptPayload { offset, .. }
            | ParseError::InvalidNumberOfArguments { offset, .. } => *offset,
        }
    }

    pub fn length(&self) -> usize {
        match self {
            ParseError::UnexpectedToken { length, .. }
            | ParseError::UnexpectedEof { length, .. }
            | ParseError::CorruptPayload { length, .. }
            | ParseError::InvalidNumberOfArguments { length, .. } => *length,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedToken { offset, length } => {
                write!(f, "unexpected token at offset {offset} (len {length})")
            }
            ParseError::UnexpectedEof { offset, .. } => {
                write!(f, "unexpected eof at offset {offset}")
            }
            ParseError::CorruptPayload { offset, length } => {
                write!(f, "corrupt payload spanning offset {offset} (len {length})")
            }
            ParseError::InvalidNumberOfArguments { offset, length } => {
                write!(f, "invalid number of arguments at offset {offset} (len {length})")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Non-recoverable errors surfaced across an API boundary (as opposed to
/// recoverable anomalies, which go through [`ErrorChannel`]).
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error("argument contains a reserved separator byte (0x1E or 0x1F)")]
    ArgumentContainsSeparator,
}

#[derive(Debug, thiserror::Error)]
pub enum ProgrammerError {
    #[error("invalid outgoing state transition for {0}")]
    InvalidOutgoingTransition(&'static str),
}
