//! Outgoing message builder (C5).
//!
//! Grounded in `examples/original_source/include/message_builder.hpp`:
//! accumulate a header and a sequence of arguments, then serialize once to
//! the full binary frame (header, arguments, trailing record separator),
//! each joined by unit separators.

use crate::error::BuilderError;
use crate::message::Header;

/// Builds one outgoing binary frame. Each `add_argument` call appends one
/// more unit-separator-delimited field; `execute` finalizes the frame with
/// the trailing record separator.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    header: Header,
    arguments: Vec<Vec<u8>>,
}

impl MessageBuilder {
    pub fn new(header: Header) -> Self {
        MessageBuilder { header, arguments: Vec::new() }
    }

    /// Append an argument. Fails if the argument contains a byte that would
    /// be mistaken for wire framing.
    pub fn add_argument(&mut self, argument: impl AsRef<[u8]>) -> Result<&mut Self, BuilderError> {
        let argument = argument.as_ref();
        if argument.iter().any(|&b| b == crate::message::UNIT_SEPARATOR || b == crate::message::RECORD_SEPARATOR) {
            return Err(BuilderError::ArgumentContainsSeparator);
        }
        self.arguments.push(argument.to_vec());
        Ok(self)
    }

    /// Number of arguments appended so far.
    pub fn size(&self) -> usize {
        self.arguments.len()
    }

    /// Serialize the accumulated header and arguments into a complete
    /// binary frame, including the trailing record separator.
    pub fn execute(&self) -> Vec<u8> {
        let mut out = self.header.to_binary();
        for arg in &self.arguments {
            out.push(crate::message::UNIT_SEPARATOR);
            out.extend_from_slice(arg);
        }
        out.push(crate::message::RECORD_SEPARATOR);
        out
    }
}
