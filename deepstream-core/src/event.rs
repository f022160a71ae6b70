//! Event pub-sub coordination (C8).
//!
//! Grounded in `examples/original_source/src/core/event.cpp`: an `Event`
//! coordinator owns the subscriber lists and listen patterns for the
//! `E|*` topic and drives them off a message dispatcher, a subscription-id
//! allocator shared with presence, and a transport it's handed per call
//! rather than storing (see [`crate::transport::Transport`] for why).

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::message::{Action, Header, Message, Topic};
use crate::message_builder::MessageBuilder;
use crate::transport::Transport;

pub type SubscriptionId = u64;

/// Process-global, monotonically increasing allocator. Shared with
/// [`crate::presence::PresenceCoordinator`] so ids are never reused across
/// the two topics, matching the original's single shared counter.
#[derive(Clone, Default)]
pub struct SubscriptionIdAllocator(Rc<Cell<u64>>);

impl SubscriptionIdAllocator {
    pub fn new() -> Self {
        SubscriptionIdAllocator(Rc::new(Cell::new(0)))
    }

    pub fn next(&self) -> SubscriptionId {
        let id = self.0.get();
        self.0.set(id + 1);
        id
    }
}

type EventCallback = Box<dyn FnMut(&[u8])>;
/// Returns `true` to accept the match (reply `E|LA`), `false` to reject
/// (reply `E|LR`).
type ListenCallback = Box<dyn FnMut(&str) -> bool>;

pub struct EventCoordinator {
    ids: SubscriptionIdAllocator,
    subscribers: HashMap<String, Vec<(SubscriptionId, EventCallback)>>,
    listeners: HashMap<String, ListenCallback>,
    send_queue: Vec<Vec<u8>>,
}

impl EventCoordinator {
    pub fn new(ids: SubscriptionIdAllocator) -> Self {
        EventCoordinator { ids, subscribers: HashMap::new(), listeners: HashMap::new(), send_queue: Vec::new() }
    }

    /// Register `callback` for `name`. Sends `E|S` only on the
    /// empty-to-non-empty transition, matching the original: repeated
    /// subscribes to an already-subscribed name do not re-send.
    pub fn subscribe(
        &mut self,
        name: &str,
        callback: impl FnMut(&[u8]) + 'static,
        transport: &mut impl Transport,
    ) -> SubscriptionId {
        let id = self.ids.next();
        let entry = self.subscribers.entry(name.to_string()).or_default();
        let was_empty = entry.is_empty();
        entry.push((id, Box::new(callback)));
        if was_empty {
            self.send_or_queue(Header::new(Topic::Event, Action::Subscribe, false), name, transport);
        }
        id
    }

    /// Remove every subscriber for `name`.
    pub fn unsubscribe(&mut self, name: &str, transport: &mut impl Transport) {
        if self.subscribers.remove(name).is_some() {
            self.send_or_queue(Header::new(Topic::Event, Action::Unsubscribe, false), name, transport);
        }
    }

    /// Remove a single subscriber; sends `E|US` only if this was the last
    /// one for `name`.
    pub fn unsubscribe_one(&mut self, name: &str, id: SubscriptionId, transport: &mut impl Transport) {
        let Some(entry) = self.subscribers.get_mut(name) else { return };
        entry.retain(|(existing, _)| *existing != id);
        if entry.is_empty() {
            self.subscribers.remove(name);
            self.send_or_queue(Header::new(Topic::Event, Action::Unsubscribe, false), name, transport);
        }
    }

    /// Register a listen pattern. `callback` is invoked with the matched
    /// name each time the server reports a new match (`E|SP`) and must
    /// return whether to accept it.
    pub fn listen(&mut self, pattern: &str, callback: impl FnMut(&str) -> bool + 'static, transport: &mut impl Transport) {
        self.listeners.insert(pattern.to_string(), Box::new(callback));
        self.send_or_queue(Header::new(Topic::Event, Action::Listen, false), pattern, transport);
    }

    pub fn unlisten(&mut self, pattern: &str, transport: &mut impl Transport) {
        if self.listeners.remove(pattern).is_some() {
            self.send_or_queue(Header::new(Topic::Event, Action::Unlisten, false), pattern, transport);
        }
    }

    /// Emit an event. Sends immediately if possible; on send failure, queues
    /// for the next successful reconnect. Local subscribers are notified
    /// synchronously either way, matching the original's "fire locally
    /// regardless of transport state" behavior.
    pub fn emit(&mut self, name: &str, data: &[u8], transport: &mut impl Transport) {
        let mut builder = MessageBuilder::new(Header::new(Topic::Event, Action::Event, false));
        let _ = builder.add_argument(name);
        let _ = builder.add_argument(data);
        let frame = builder.execute();
        if transport.send(&frame).is_err() {
            self.send_queue.push(frame);
        }
        self.notify_subscribers(name, data);
    }

    /// Dispatch one inbound `E|*` message.
    pub fn notify(&mut self, message: &Message<'_>, transport: &mut impl Transport) {
        match (message.action(), message.is_ack()) {
            (Action::Event, false) => {
                if let Some(name) = message.argument(0) {
                    let name = String::from_utf8_lossy(name).into_owned();
                    let data = message.argument(1).unwrap_or(&[]);
                    self.notify_subscribers(&name, data);
                }
            }
            (Action::SubscriptionForPatternFound, false) => {
                self.notify_listener_found(message, transport);
            }
            (Action::SubscriptionForPatternRemoved, false) => {
                self.notify_listener_removed(message);
            }
            _ => {}
        }
    }

    /// Snapshot the subscriber id list before iterating, so a subscriber
    /// callback that itself subscribes or unsubscribes during dispatch
    /// cannot invalidate the iteration (directly grounded in
    /// `notify_subscribers_` in the original, which copies the id list for
    /// exactly this reason).
    fn notify_subscribers(&mut self, name: &str, data: &[u8]) {
        let Some(entry) = self.subscribers.get(name) else { return };
        let ids: Vec<SubscriptionId> = entry.iter().map(|(id, _)| *id).collect();
        for id in ids {
            let Some(entry) = self.subscribers.get_mut(name) else { continue };
            if let Some((_, callback)) = entry.iter_mut().find(|(existing, _)| *existing == id) {
                callback(data);
            }
        }
    }

    fn notify_listener_found(&mut self, message: &Message<'_>, transport: &mut impl Transport) {
        let (Some(pattern), Some(name)) = (message.argument(0), message.argument(1)) else { return };
        let pattern = String::from_utf8_lossy(pattern).into_owned();
        let name = String::from_utf8_lossy(name).into_owned();
        let accept = self.listeners.get_mut(&pattern).map(|cb| cb(&name)).unwrap_or(false);
        let action = if accept { Action::ListenAccept } else { Action::ListenReject };
        let mut builder = MessageBuilder::new(Header::new(Topic::Event, action, false));
        let _ = builder.add_argument(&pattern);
        let _ = builder.add_argument(&name);
        let _ = transport.send(&builder.execute());
    }

    /// `E|SR` is informational only: the original does not reply to it,
    /// unlike `E|SP` which always gets an `E|LA`/`E|LR` back.
    fn notify_listener_removed(&mut self, _message: &Message<'_>) {}

    fn send_or_queue(&mut self, header: Header, argument: &str, transport: &mut impl Transport) {
        let mut builder = MessageBuilder::new(header);
        let _ = builder.add_argument(argument);
        let frame = builder.execute();
        if transport.send(&frame).is_err() {
            self.send_queue.push(frame);
        }
    }

    /// Re-establish subscriptions and listen patterns after a reconnect,
    /// then flush anything that was queued while disconnected. Grounded in
    /// `on_connection_state_change_`: subscriptions first, then listeners,
    /// then the send queue, stopping the flush at the first failed send
    /// (not aborting the whole pass, just leaving the remainder queued for
    /// the next successful open).
    pub fn on_reconnected(&mut self, transport: &mut impl Transport) {
        let names: Vec<String> = self.subscribers.keys().cloned().collect();
        for name in names {
            self.send_or_queue(Header::new(Topic::Event, Action::Subscribe, false), &name, transport);
        }
        let patterns: Vec<String> = self.listeners.keys().cloned().collect();
        for pattern in patterns {
            self.send_or_queue(Header::new(Topic::Event, Action::Listen, false), &pattern, transport);
        }

        let mut remaining = Vec::new();
        let mut queue = std::mem::take(&mut self.send_queue);
        let mut stopped = false;
        for frame in queue.drain(..) {
            if stopped {
                remaining.push(frame);
                continue;
            }
            if transport.send(&frame).is_err() {
                remaining.push(frame);
                stopped = true;
            }
        }
        self.send_queue = remaining;
    }
}
