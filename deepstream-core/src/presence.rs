//! Presence pub-sub coordination (C9).
//!
//! Grounded in `examples/original_source/src/core/presence.cpp`. The
//! `get_all` / query-answer semantics resolve an ambiguity left open by
//! distillation: a single inbound `U|Q` answer invokes **every** pending
//! querent, not just the oldest one, then clears the querent list
//! entirely — the original drains the whole queue per answer rather than
//! popping one at a time. `get_all` sends `U|Q|Q+`, not a bare `U|Q+`: the
//! query carries its own `"Q"` argument, matching `uqq.add_argument("Q")`
//! in the original.
//!
//! `unsubscribe` (by id) and `unsubscribe_all` are two distinct
//! operations, mirroring `Presence::unsubscribe(id)` and the parameterless
//! `Presence::unsubscribe()` overload in the original: the former sends
//! `U|US` only once the last subscriber is gone, the latter clears
//! everything and always sends `U|US`.

use std::collections::HashMap;

use crate::event::{SubscriptionId, SubscriptionIdAllocator};
use crate::message::{Action, Header, Message, Topic};
use crate::message_builder::MessageBuilder;
use crate::transport::Transport;

type JoinLeaveCallback = Box<dyn FnMut(&str, bool)>;
type QueryCallback = Box<dyn FnOnce(&[String])>;

pub struct PresenceCoordinator {
    ids: SubscriptionIdAllocator,
    subscribers: HashMap<SubscriptionId, JoinLeaveCallback>,
    querents: Vec<QueryCallback>,
}

impl PresenceCoordinator {
    pub fn new(ids: SubscriptionIdAllocator) -> Self {
        PresenceCoordinator { ids, subscribers: HashMap::new(), querents: Vec::new() }
    }

    /// Subscribe to join/leave notifications. Sends `U|S` only on the
    /// empty-to-non-empty transition.
    pub fn subscribe(&mut self, callback: impl FnMut(&str, bool) + 'static, transport: &mut impl Transport) -> SubscriptionId {
        let id = self.ids.next();
        let was_empty = self.subscribers.is_empty();
        self.subscribers.insert(id, Box::new(callback));
        if was_empty {
            let _ = transport.send(&MessageBuilder::new(Header::new(Topic::Presence, Action::Subscribe, false)).execute());
        }
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId, transport: &mut impl Transport) {
        self.subscribers.remove(&id);
        if self.subscribers.is_empty() {
            let _ = transport
                .send(&MessageBuilder::new(Header::new(Topic::Presence, Action::Unsubscribe, false)).execute());
        }
    }

    /// Remove every join/leave subscriber unconditionally and send `U|US`,
    /// regardless of how many were registered.
    pub fn unsubscribe_all(&mut self, transport: &mut impl Transport) {
        self.subscribers.clear();
        let _ =
            transport.send(&MessageBuilder::new(Header::new(Topic::Presence, Action::Unsubscribe, false)).execute());
    }

    /// Request the full list of currently online users. `callback` fires
    /// once the server answers with `U|Q`; every outstanding `get_all` call
    /// since the last answer fires off the same reply (see module docs).
    /// `U|Q` is sent only on the empty-to-non-empty transition, so a burst
    /// of calls before the server answers produces exactly one query.
    pub fn get_all(&mut self, callback: impl FnOnce(&[String]) + 'static, transport: &mut impl Transport) {
        let was_empty = self.querents.is_empty();
        self.querents.push(Box::new(callback));
        if was_empty {
            let mut builder = MessageBuilder::new(Header::new(Topic::Presence, Action::Query, false));
            let _ = builder.add_argument("Q");
            let _ = transport.send(&builder.execute());
        }
    }

    pub fn notify(&mut self, message: &Message<'_>) {
        match message.action() {
            Action::PresenceJoin => {
                if let Some(user) = message.argument(0) {
                    self.notify_subscribers(&String::from_utf8_lossy(user), true);
                }
            }
            Action::PresenceLeave => {
                if let Some(user) = message.argument(0) {
                    self.notify_subscribers(&String::from_utf8_lossy(user), false);
                }
            }
            Action::Query => {
                let users: Vec<String> =
                    (0..message.num_arguments()).filter_map(|i| message.argument(i)).map(|a| String::from_utf8_lossy(a).into_owned()).collect();
                for querent in self.querents.drain(..) {
                    querent(&users);
                }
            }
            _ => {}
        }
    }

    fn notify_subscribers(&mut self, user: &str, joined: bool) {
        let ids: Vec<SubscriptionId> = self.subscribers.keys().copied().collect();
        for id in ids {
            if let Some(callback) = self.subscribers.get_mut(&id) {
                callback(user, joined);
            }
        }
    }
}
