//! Connection handshake / auth / redirect / reconnect state machine (C6).
//!
//! Modeled as two pure functions, `transition_incoming` and
//! `transition_outgoing`, rather than one combined `transition(state,
//! message, sender)` function. `examples/original_source/src/core/state.cpp`
//! has the single combined form, but `examples/original_source/src/core/connection.cpp`
//! already calls out to `transition_incoming`/`transition_outgoing`
//! separately depending on which side produced the message, so that split
//! is the one carried forward here. State names and the transition tables
//! themselves follow the handshake description directly: `AWAIT_CONNECTION`
//! / `CHALLENGING` / `CHALLENGING_WAIT` / `AWAIT_AUTHENTICATION` /
//! `AUTHENTICATING` / `OPEN` / `CLOSED` / `RECONNECTING` / `ERROR`.
//!
//! `CONNECTION/PING`, and `EVENT`/`PRESENCE` traffic while `OPEN`, never
//! reach these functions: the driver dispatches those directly (an
//! immediate `C|PO` reply, or a hand-off to the event/presence
//! coordinators) before consulting the state machine at all.

use crate::message::{Action, Header, Topic};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitConnection,
    Challenging,
    ChallengingWait,
    AwaitAuthentication,
    Authenticating,
    Open,
    Closed,
    Reconnecting,
    Error,
}

/// Effect the driver must carry out as a result of a transition, beyond
/// just updating `state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    None,
    SendChallengeResponse,
    FollowRedirect,
    NotifyLoginSuccess,
    NotifyLoginFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: ConnectionState,
    pub effect: TransitionEffect,
}

impl Transition {
    fn to(state: ConnectionState, effect: TransitionEffect) -> Self {
        Transition { state, effect }
    }
}

/// Advance the machine in response to a `CONNECTION` or `AUTH` message
/// received from the server. Returns `None` when the pair is not in the
/// table — a state-machine error per the error taxonomy, which the driver
/// reports and then closes the connection over.
pub fn transition_incoming(state: ConnectionState, header: Header) -> Option<Transition> {
    use ConnectionState::*;
    match (state, header.topic, header.action, header.is_ack) {
        (AwaitConnection, Topic::Connection, Action::Challenge, false) => {
            Some(Transition::to(Challenging, TransitionEffect::SendChallengeResponse))
        }
        (ChallengingWait, Topic::Connection, Action::ChallengeResponse, true) => {
            Some(Transition::to(AwaitAuthentication, TransitionEffect::None))
        }
        (ChallengingWait, Topic::Connection, Action::Redirect, false) => {
            Some(Transition::to(AwaitConnection, TransitionEffect::FollowRedirect))
        }
        (ChallengingWait, Topic::Connection, Action::Reject, false) => {
            Some(Transition::to(Closed, TransitionEffect::None))
        }
        (Authenticating, Topic::Auth, Action::Request, true) => {
            Some(Transition::to(Open, TransitionEffect::NotifyLoginSuccess))
        }
        (Authenticating, Topic::Auth, Action::ErrorInvalidAuthData, false) => {
            Some(Transition::to(AwaitAuthentication, TransitionEffect::NotifyLoginFailure))
        }
        (Authenticating, Topic::Auth, Action::ErrorInvalidAuthMsg, false) => {
            Some(Transition::to(Closed, TransitionEffect::NotifyLoginFailure))
        }
        (Authenticating, Topic::Auth, Action::ErrorTooManyAuthAttempts, false) => {
            Some(Transition::to(Closed, TransitionEffect::NotifyLoginFailure))
        }
        _ => None,
    }
}

/// Check whether the client may send `header` while in `state`, returning
/// the resulting state if so. `None` means the send is illegal: a
/// programmer error per the taxonomy (e.g. sending `EVENT` traffic before
/// `OPEN`).
pub fn transition_outgoing(state: ConnectionState, header: Header) -> Option<ConnectionState> {
    use ConnectionState::*;
    match header.topic {
        Topic::Connection => match header.action {
            Action::ChallengeResponse if state == Challenging => Some(ChallengingWait),
            Action::Pong => Some(state),
            _ => None,
        },
        Topic::Auth => match header.action {
            Action::Request if state == AwaitAuthentication => Some(Authenticating),
            _ => None,
        },
        _ => {
            if state == Open {
                Some(state)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Action, Header, Topic};

    #[test]
    fn full_happy_path_handshake() {
        let t = transition_incoming(
            ConnectionState::AwaitConnection,
            Header::new(Topic::Connection, Action::Challenge, false),
        )
        .unwrap();
        assert_eq!(t.state, ConnectionState::Challenging);
        assert_eq!(t.effect, TransitionEffect::SendChallengeResponse);

        let next =
            transition_outgoing(t.state, Header::new(Topic::Connection, Action::ChallengeResponse, false)).unwrap();
        assert_eq!(next, ConnectionState::ChallengingWait);

        let t2 = transition_incoming(
            next,
            Header::new(Topic::Connection, Action::ChallengeResponse, true),
        )
        .unwrap();
        assert_eq!(t2.state, ConnectionState::AwaitAuthentication);

        let auth_state =
            transition_outgoing(t2.state, Header::new(Topic::Auth, Action::Request, false)).unwrap();
        assert_eq!(auth_state, ConnectionState::Authenticating);

        let t3 = transition_incoming(auth_state, Header::new(Topic::Auth, Action::Request, true)).unwrap();
        assert_eq!(t3.state, ConnectionState::Open);
        assert_eq!(t3.effect, TransitionEffect::NotifyLoginSuccess);
    }

    #[test]
    fn redirect_returns_to_await_connection() {
        let t = transition_incoming(
            ConnectionState::ChallengingWait,
            Header::new(Topic::Connection, Action::Redirect, false),
        )
        .unwrap();
        assert_eq!(t.state, ConnectionState::AwaitConnection);
        assert_eq!(t.effect, TransitionEffect::FollowRedirect);
    }

    #[test]
    fn reject_closes() {
        let t = transition_incoming(
            ConnectionState::ChallengingWait,
            Header::new(Topic::Connection, Action::Reject, false),
        )
        .unwrap();
        assert_eq!(t.state, ConnectionState::Closed);
    }

    #[test]
    fn invalid_auth_data_is_retryable_not_fatal() {
        let t = transition_incoming(
            ConnectionState::Authenticating,
            Header::new(Topic::Auth, Action::ErrorInvalidAuthData, false),
        )
        .unwrap();
        assert_eq!(t.state, ConnectionState::AwaitAuthentication);
        assert_eq!(t.effect, TransitionEffect::NotifyLoginFailure);
    }

    #[test]
    fn invalid_auth_msg_and_too_many_attempts_are_fatal() {
        let t1 = transition_incoming(
            ConnectionState::Authenticating,
            Header::new(Topic::Auth, Action::ErrorInvalidAuthMsg, false),
        )
        .unwrap();
        assert_eq!(t1.state, ConnectionState::Closed);

        let t2 = transition_incoming(
            ConnectionState::Authenticating,
            Header::new(Topic::Auth, Action::ErrorTooManyAuthAttempts, false),
        )
        .unwrap();
        assert_eq!(t2.state, ConnectionState::Closed);
    }

    #[test]
    fn outgoing_event_requires_open() {
        let header = Header::new(Topic::Event, Action::Subscribe, false);
        assert_eq!(transition_outgoing(ConnectionState::AwaitAuthentication, header), None);
        assert_eq!(transition_outgoing(ConnectionState::Open, header), Some(ConnectionState::Open));
    }

    #[test]
    fn outgoing_pong_is_always_legal_and_state_preserving() {
        let header = Header::new(Topic::Connection, Action::Pong, false);
        assert_eq!(transition_outgoing(ConnectionState::Closed, header), Some(ConnectionState::Closed));
    }

    #[test]
    fn unrecognized_incoming_pair_is_none() {
        assert!(transition_incoming(ConnectionState::Closed, Header::new(Topic::Event, Action::Event, false))
            .is_none());
    }
}
