//! Framing vocabulary (C2): the closed Topic/Action sets, the canonical
//! header table, and the human-readable <-> binary transforms.
//!
//! Grounded in `examples/original_source/src/core/message.hpp` (the Topic
//! and Action enums and the ASCII separator constants) and
//! `examples/original_source/src/message.cpp` (the `|`/`+` substitution).

use std::sync::OnceLock;

pub const UNIT_SEPARATOR: u8 = 0x1F;
pub const RECORD_SEPARATOR: u8 = 0x1E;

/// The high-level category of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Auth,
    Connection,
    Error,
    Event,
    Presence,
    Record,
    Rpc,
}

/// The verb within a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Challenge,
    ChallengeResponse,
    Redirect,
    Reject,
    Request,
    Ping,
    Pong,
    Subscribe,
    Unsubscribe,
    Listen,
    Unlisten,
    Event,
    ListenAccept,
    ListenReject,
    SubscriptionForPatternFound,
    SubscriptionForPatternRemoved,
    PresenceJoin,
    PresenceLeave,
    Query,
    ErrorInvalidAuthData,
    ErrorInvalidAuthMsg,
    ErrorTooManyAuthAttempts,
}

/// The `(Topic, Action, is_ack)` triple identifying one legal wire header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    pub topic: Topic,
    pub action: Action,
    pub is_ack: bool,
}

impl Header {
    pub const fn new(topic: Topic, action: Action, is_ack: bool) -> Self {
        Header { topic, action, is_ack }
    }

    /// The `[min, max]` argument count this header accepts. `max ==
    /// usize::MAX` means unbounded (e.g. a presence query answer listing
    /// every online user).
    pub fn arity(&self) -> (usize, usize) {
        raw_table()
            .iter()
            .find(|row| row.header == *self)
            .map(|row| row.arity)
            .unwrap_or((0, usize::MAX))
    }

    /// The human-readable form, e.g. `"E|S"`, `"A|A"`, `"C|CHR"`. Uses `|`
    /// as the field separator; never includes the trailing record
    /// separator.
    pub fn human_str(&self) -> &'static str {
        raw_table()
            .iter()
            .find(|row| row.header == *self)
            .map(|row| row.human)
            .unwrap_or("?")
    }

    /// The binary encoding of the header alone (`|` replaced by the unit
    /// separator); does not include a trailing record separator.
    pub fn to_binary(&self) -> Vec<u8> {
        from_human_readable(self.human_str())
    }
}

struct HeaderRow {
    header: Header,
    human: &'static str,
    arity: (usize, usize),
}

macro_rules! row {
    ($topic:ident, $action:ident, $ack:expr, $human:expr, $min:expr, $max:expr) => {
        HeaderRow {
            header: Header::new(Topic::$topic, Action::$action, $ack),
            human: $human,
            arity: ($min, $max),
        }
    };
}

fn raw_table() -> &'static [HeaderRow] {
    static TABLE: OnceLock<Vec<HeaderRow>> = OnceLock::new();
    TABLE.get_or_init(|| {
        vec![
            // AUTH
            row!(Auth, Request, false, "A|REQ", 1, 1),
            row!(Auth, Request, true, "A|A", 0, 1),
            row!(Auth, ErrorInvalidAuthData, false, "A|E|INVALID_AUTH_DATA", 0, 1),
            row!(Auth, ErrorInvalidAuthMsg, false, "A|E|INVALID_AUTH_MSG", 0, 1),
            row!(Auth, ErrorTooManyAuthAttempts, false, "A|E|TOO_MANY_AUTH_ATTEMPTS", 0, 1),
            // CONNECTION
            row!(Connection, Challenge, false, "C|CH", 0, 0),
            row!(Connection, ChallengeResponse, false, "C|CHR", 1, 1),
            row!(Connection, ChallengeResponse, true, "C|A", 0, 0),
            row!(Connection, Redirect, false, "C|RED", 1, 1),
            row!(Connection, Reject, false, "C|REJ", 0, 0),
            row!(Connection, Ping, false, "C|PI", 0, 0),
            row!(Connection, Pong, false, "C|PO", 0, 0),
            // EVENT
            row!(Event, Subscribe, false, "E|S", 1, 1),
            row!(Event, Subscribe, true, "E|A|S", 1, 1),
            row!(Event, Unsubscribe, false, "E|US", 1, 1),
            row!(Event, Unsubscribe, true, "E|A|US", 1, 1),
            row!(Event, Listen, false, "E|L", 1, 1),
            row!(Event, Listen, true, "E|A|L", 1, 1),
            row!(Event, Unlisten, false, "E|UL", 1, 1),
            row!(Event, Unlisten, true, "E|A|UL", 1, 1),
            row!(Event, Event, false, "E|EVT", 1, 2),
            row!(Event, ListenAccept, false, "E|LA", 2, 2),
            row!(Event, ListenReject, false, "E|LR", 2, 2),
            row!(Event, SubscriptionForPatternFound, false, "E|SP", 2, 2),
            row!(Event, SubscriptionForPatternRemoved, false, "E|SR", 2, 2),
            // PRESENCE
            row!(Presence, Subscribe, false, "U|S", 0, 0),
            row!(Presence, Subscribe, true, "U|A|S", 0, 0),
            row!(Presence, Unsubscribe, false, "U|US", 0, 0),
            row!(Presence, Unsubscribe, true, "U|A|US", 0, 0),
            row!(Presence, PresenceJoin, false, "U|PNJ", 1, 1),
            row!(Presence, PresenceLeave, false, "U|PNL", 1, 1),
            row!(Presence, Query, false, "U|Q", 0, usize::MAX),
        ]
    })
}

/// Header table sorted by descending binary length, for longest-match
/// scanning. Built once and cached.
pub(crate) fn headers_by_binary_len_desc() -> &'static [(Vec<u8>, Header)] {
    static SORTED: OnceLock<Vec<(Vec<u8>, Header)>> = OnceLock::new();
    SORTED.get_or_init(|| {
        let mut entries: Vec<(Vec<u8>, Header)> =
            raw_table().iter().map(|row| (from_human_readable(row.human), row.header)).collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        entries
    })
}

/// Replace `|` with the unit separator (0x1F) and `+` with the record
/// separator (0x1E); every other byte passes through unchanged. Total and
/// the exact inverse of [`to_human_readable`].
pub fn from_human_readable(s: &str) -> Vec<u8> {
    s.bytes()
        .map(|b| match b {
            b'|' => UNIT_SEPARATOR,
            b'+' => RECORD_SEPARATOR,
            other => other,
        })
        .collect()
}

/// Replace the unit separator (0x1F) with `|` and the record separator
/// (0x1E) with `+`; every other byte passes through unchanged.
pub fn to_human_readable(buf: &[u8]) -> String {
    buf.iter()
        .map(|&b| match b {
            UNIT_SEPARATOR => '|',
            RECORD_SEPARATOR => '+',
            other => other as char,
        })
        .collect()
}

/// A single argument span within a parsed message's source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub offset: usize,
    pub length: usize,
}

/// A parsed message: a header plus argument spans referencing the receive
/// buffer it was parsed from. Borrowed for the lifetime of that buffer —
/// callers that need to retain argument bytes past the current
/// `process_messages` batch must copy them into an owned [`Buffer`] first.
#[derive(Debug, Clone)]
pub struct Message<'a> {
    source: &'a [u8],
    header: Header,
    span: Span,
    arguments: Vec<Span>,
}

impl<'a> Message<'a> {
    pub(crate) fn new(source: &'a [u8], header: Header, span: Span, arguments: Vec<Span>) -> Self {
        Message { source, header, span, arguments }
    }

    pub fn header(&self) -> Header {
        self.header
    }

    pub fn topic(&self) -> Topic {
        self.header.topic
    }

    pub fn action(&self) -> Action {
        self.header.action
    }

    pub fn is_ack(&self) -> bool {
        self.header.is_ack
    }

    pub fn num_arguments(&self) -> usize {
        self.arguments.len()
    }

    pub fn argument(&self, index: usize) -> Option<&'a [u8]> {
        self.arguments
            .get(index)
            .map(|span| &self.source[span.offset..span.offset + span.length])
    }

    /// The full encoded message, including header and trailing separator.
    pub fn raw(&self) -> &'a [u8] {
        &self.source[self.span.offset..self.span.offset + self.span.length]
    }

    pub fn offset(&self) -> usize {
        self.span.offset
    }

    pub fn size(&self) -> usize {
        self.span.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_readable_round_trip() {
        let human = "E|S|adam+";
        let binary = from_human_readable(human);
        assert_eq!(binary, b"E\x1FS\x1Fadam\x1E");
        assert_eq!(to_human_readable(&binary), human);
    }

    #[test]
    fn arity_lookup() {
        let h = Header::new(Topic::Event, Action::Event, false);
        assert_eq!(h.arity(), (1, 2));
        let h = Header::new(Topic::Presence, Action::Query, false);
        assert_eq!(h.arity(), (0, usize::MAX));
    }

    #[test]
    fn human_str_matches_table() {
        let h = Header::new(Topic::Connection, Action::ChallengeResponse, false);
        assert_eq!(h.human_str(), "C|CHR");
        let ack = Header::new(Topic::Connection, Action::ChallengeResponse, true);
        assert_eq!(ack.human_str(), "C|A");
    }

    #[test]
    fn longest_match_table_has_e_s_prefix_collisions() {
        let entries = headers_by_binary_len_desc();
        let e_s = from_human_readable("E|S");
        let e_sp = from_human_readable("E|SP");
        assert!(e_sp.starts_with(&e_s));
        // E|SP must sort before E|S since it is longer.
        let pos_sp = entries.iter().position(|(bytes, _)| *bytes == e_sp).unwrap();
        let pos_s = entries.iter().position(|(bytes, _)| *bytes == e_s).unwrap();
        assert!(pos_sp < pos_s);
    }
}
