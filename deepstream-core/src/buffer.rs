//! Owned byte buffer (C1).
//!
//! Mirrors the handful of constructors the original C++ `Buffer` type
//! exposed (from a literal, from a `std::string`, from a pointer+length
//! pair) so call sites read the same way regardless of where the bytes
//! originated.

use std::fmt;

/// An owned, mutable byte sequence.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Buffer(Vec<u8>);

impl Buffer {
    pub fn new() -> Self {
        Buffer(Vec::new())
    }

    pub fn with_capacity(cap: usize) -> Self {
        Buffer(Vec::with_capacity(cap))
    }

    /// Build a buffer by copying a sub-range `[offset, offset + length)` of
    /// `source`. This is the "iter-pair" constructor: it exists so argument
    /// spans produced by the parser (an offset/length pair into the receive
    /// buffer) can be turned into an owned, independently-lived `Buffer`.
    pub fn from_span(source: &[u8], offset: usize, length: usize) -> Self {
        Buffer(source[offset..offset + length].to_vec())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, byte: u8) {
        self.0.push(byte);
    }

    pub fn extend_from_slice(&mut self, other: &[u8]) {
        self.0.extend_from_slice(other);
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// `true` if any byte equals the wire separators (unit separator 0x1F or
    /// record separator 0x1E). Arguments containing these bytes cannot be
    /// represented without corrupting the framing.
    pub fn contains_separator(&self) -> bool {
        self.0.iter().any(|&b| b == crate::message::UNIT_SEPARATOR || b == crate::message::RECORD_SEPARATOR)
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "Buffer({s:?})"),
            Err(_) => write!(f, "Buffer({:?})", self.0),
        }
    }
}

impl std::ops::Deref for Buffer {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Buffer {
    fn from(s: &str) -> Self {
        Buffer(s.as_bytes().to_vec())
    }
}

impl From<String> for Buffer {
    fn from(s: String) -> Self {
        Buffer(s.into_bytes())
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(v: Vec<u8>) -> Self {
        Buffer(v)
    }
}

impl From<&[u8]> for Buffer {
    fn from(v: &[u8]) -> Self {
        Buffer(v.to_vec())
    }
}

impl FromIterator<u8> for Buffer {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        Buffer(iter.into_iter().collect())
    }
}
