//! Byte-level scanner (C3).
//!
//! A deterministic longest-match recogniser over a byte buffer. Grounded in
//! the flex/bison lexer of `examples/original_source/include/parser.h` (the
//! closed token set) and `bison-demo`/`flex-demo`, reworked as a hand-rolled
//! scanner since Rust has no flex equivalent in the dependency stack of any
//! example repo in the pack.

use crate::message::{headers_by_binary_len_desc, Header, RECORD_SEPARATOR, UNIT_SEPARATOR};

/// One scanner token. Carries the matched [`Header`] directly rather than
/// an intermediate per-header token id: in Rust the header table lookup
/// and the token variant are the same closed set, so there is no value in
/// duplicating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Header(Header),
    Payload,
    MessageSeparator,
    Unknown,
    Eof,
}

/// A scanned token together with its byte range `[offset, offset+length)`
/// in the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scanned {
    pub token: Token,
    pub offset: usize,
    pub length: usize,
}

pub struct Scanner<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Scanner { buf, pos: 0 }
    }

    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Scan and consume the next token. Once `Eof` has been returned,
    /// further calls keep returning `Eof` at the same offset.
    pub fn next_token(&mut self) -> Scanned {
        let start = self.pos;

        if start >= self.buf.len() {
            return Scanned { token: Token::Eof, offset: start, length: 0 };
        }

        let b = self.buf[start];

        if b == RECORD_SEPARATOR {
            // A server may follow the record separator with a newline;
            // absorb it into the same token so it never surfaces as
            // scanner noise.
            let mut len = 1;
            if self.buf.get(start + 1) == Some(&b'\n') {
                len = 2;
            }
            self.pos = start + len;
            return Scanned { token: Token::MessageSeparator, offset: start, length: len };
        }

        if b == UNIT_SEPARATOR {
            let mut end = start + 1;
            while end < self.buf.len()
                && self.buf[end] != UNIT_SEPARATOR
                && self.buf[end] != RECORD_SEPARATOR
            {
                end += 1;
            }
            self.pos = end;
            return Scanned { token: Token::Payload, offset: start, length: end - start };
        }

        if let Some((header, len)) = longest_header_match(&self.buf[start..]) {
            self.pos = start + len;
            return Scanned { token: Token::Header(header), offset: start, length: len };
        }

        let mut end = start + 1;
        while end < self.buf.len() && self.buf[end] != UNIT_SEPARATOR && self.buf[end] != RECORD_SEPARATOR {
            end += 1;
        }
        self.pos = end;
        Scanned { token: Token::Unknown, offset: start, length: end - start }
    }
}

fn longest_header_match(remaining: &[u8]) -> Option<(Header, usize)> {
    // Table is pre-sorted by descending byte length, so the first match is
    // the longest one: this is what resolves prefix collisions like `E|S`
    // vs `E|SP`/`E|SR`, or `E|L` vs `E|LA`/`E|LR`.
    for (bytes, header) in headers_by_binary_len_desc() {
        if remaining.len() >= bytes.len() && &remaining[..bytes.len()] == bytes.as_slice() {
            return Some((*header, bytes.len()));
        }
    }
    None
}
