//! Message parser (C4).
//!
//! Consumes the scanner's token stream and assembles [`Message`]s
//! referencing the source buffer, recovering at the next legal position
//! after any anomaly rather than aborting the whole batch.
//!
//! Grounded in `examples/original_source/src/parser.cpp`
//! (`deepstream_parser_state::handle_token` and friends), with one
//! deliberate divergence: the original's `TOKEN_C_REJ` case falls through
//! into `TOKEN_E_A_L` without a `break` (a bug noted in spec section 9 item
//! 1). This parser's `match` makes every header case independent, so no
//! such fall-through is possible.

use crate::error::ParseError;
use crate::message::{Header, Message, Span};
use crate::scanner::{Scanner, Token};

/// Parse one frame's worth of bytes into zero or more messages plus zero or
/// more recoverable errors. For every byte of `buf`, either a message spans
/// it or exactly one error does; message spans are disjoint and
/// monotonically increasing.
pub fn parse(buf: &[u8]) -> (Vec<Message<'_>>, Vec<ParseError>) {
    let mut scanner = Scanner::new(buf);
    let mut tokenizing_header = true;
    let mut messages = Vec::new();
    let mut errors = Vec::new();

    // The message currently being assembled: its header, its start offset,
    // and the argument spans seen so far.
    let mut current: Option<(Header, usize, Vec<Span>)> = None;

    loop {
        let scanned = scanner.next_token();

        match scanned.token {
            Token::Eof => {
                if !tokenizing_header {
                    if let Some((_, start, _)) = current.take() {
                        errors.push(ParseError::UnexpectedEof {
                            offset: start,
                            length: scanned.offset - start,
                        });
                    }
                }
                break;
            }

            Token::Unknown => {
                if tokenizing_header {
                    errors.push(ParseError::UnexpectedToken {
                        offset: scanned.offset,
                        length: scanned.length,
                    });
                    // Stay in header mode: the next token is tried fresh as
                    // a header, a stray separator, or more garbage.
                } else if let Some((_, start, _)) = current.take() {
                    let end = scanned.offset + scanned.length;
                    errors.push(ParseError::CorruptPayload { offset: start, length: end - start });
                    tokenizing_header = true;
                }
            }

            Token::Header(header) => {
                if tokenizing_header {
                    current = Some((header, scanned.offset, Vec::new()));
                    tokenizing_header = false;
                } else {
                    // A header where a payload or separator was expected:
                    // abandon whatever message was open and report it, but
                    // do not reinterpret this token as the start of a new
                    // message.
                    current = None;
                    tokenizing_header = true;
                    errors.push(ParseError::UnexpectedToken {
                        offset: scanned.offset,
                        length: scanned.length,
                    });
                }
            }

            Token::Payload => {
                if let Some((_, _, args)) = current.as_mut() {
                    args.push(Span { offset: scanned.offset + 1, length: scanned.length - 1 });
                } else {
                    // A payload field with no open header: malformed, but
                    // recoverable.
                    errors.push(ParseError::UnexpectedToken {
                        offset: scanned.offset,
                        length: scanned.length,
                    });
                }
            }

            Token::MessageSeparator => {
                if let Some((header, start, args)) = current.take() {
                    let end = scanned.offset + scanned.length;
                    let msg_len = end - start;
                    let (min, max) = header.arity();
                    let num_args = args.len();

                    if num_args >= min && num_args <= max {
                        messages.push(Message::new(
                            buf,
                            header,
                            Span { offset: start, length: msg_len },
                            args,
                        ));
                    } else {
                        errors.push(ParseError::InvalidNumberOfArguments {
                            offset: start,
                            length: msg_len,
                        });
                    }
                }
                // A separator with no open message (e.g. a stray empty
                // line, or the separator following a run of garbage that
                // was already reported) is a harmless resync point.
                tokenizing_header = true;
            }
        }
    }

    (messages, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{from_human_readable, Action, Topic};

    #[test]
    fn round_trip_well_formed_sequence() {
        let input = from_human_readable("E|S|adam+E|L|foo.*+C|PI+");
        let (messages, errors) = parse(&input);
        assert!(errors.is_empty());
        assert_eq!(messages.len(), 3);

        assert_eq!(messages[0].header(), Header::new(Topic::Event, Action::Subscribe, false));
        assert_eq!(messages[0].argument(0), Some(&b"adam"[..]));

        assert_eq!(messages[1].header(), Header::new(Topic::Event, Action::Listen, false));
        assert_eq!(messages[1].argument(0), Some(&b"foo.*"[..]));

        assert_eq!(messages[2].header(), Header::new(Topic::Connection, Action::Ping, false));
        assert_eq!(messages[2].num_arguments(), 0);

        // Spans partition the input: every byte belongs to exactly one message.
        let mut covered = 0;
        for m in &messages {
            assert_eq!(m.offset(), covered);
            covered += m.size();
        }
        assert_eq!(covered, input.len());
    }

    #[test]
    fn recovers_from_corrupt_garbage_between_messages() {
        // `E|S|x+ZZZ+E|L|p+`: garbage between two well-formed messages.
        let mut input = from_human_readable("E|S|x+");
        input.extend_from_slice(b"ZZZ");
        input.extend_from_slice(&from_human_readable("+E|L|p+"));

        let (messages, errors) = parse(&input);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].argument(0), Some(&b"x"[..]));
        assert_eq!(messages[1].argument(0), Some(&b"p"[..]));
        assert_eq!(errors.len(), 1);
        matches!(errors[0], ParseError::UnexpectedToken { .. });
    }

    #[test]
    fn invalid_number_of_arguments_is_rejected() {
        // E|S requires exactly one argument.
        let input = from_human_readable("E|S+");
        let (messages, errors) = parse(&input);
        assert!(messages.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ParseError::InvalidNumberOfArguments { .. }));
    }

    #[test]
    fn unexpected_eof_mid_payload_drops_open_message() {
        let input = from_human_readable("E|S|ad");
        // No trailing separator: truncated mid-argument.
        let (messages, errors) = parse(&input);
        assert!(messages.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn parser_monotonicity_errors_never_precede_prior_message_end() {
        let mut input = from_human_readable("E|S|x+");
        input.extend_from_slice(b"@@@");
        input.extend_from_slice(&from_human_readable("+"));
        let (messages, errors) = parse(&input);
        let last_message_end = messages.last().map(|m| m.offset() + m.size()).unwrap_or(0);
        for e in &errors {
            assert!(e.offset() >= last_message_end);
        }
    }

    #[test]
    fn header_token_in_payload_position_is_unexpected_token_not_panic() {
        // An E|S header appears where a payload/separator was expected.
        let mut input = from_human_readable("C|CH");
        input.extend_from_slice(&from_human_readable("E|S"));
        input.extend_from_slice(&from_human_readable("+"));
        let (_messages, errors) = parse(&input);
        assert!(!errors.is_empty());
    }

    #[test]
    fn empty_input_parses_to_nothing() {
        let (messages, errors) = parse(&[]);
        assert!(messages.is_empty());
        assert!(errors.is_empty());
    }
}
