//! Multi-component integration tests against the concrete scenarios and
//! cross-cutting properties, exercised through the full `ConnectionDriver`
//! rather than individual unit tests on each coordinator.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::PseudoTransport;
use deepstream_core::{ClientOptions, ConnectionDriver, ConnectionState};

fn options(url: &str) -> ClientOptions {
    ClientOptions { url: url.to_string(), ..ClientOptions::default() }
}

fn driver_past_handshake(url: &str) -> ConnectionDriver<PseudoTransport> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();

    let mut driver = ConnectionDriver::new(PseudoTransport::new(), options(url));
    driver.connect();
    driver.process_messages();
    driver.transport_mut().deliver("C|CH+");
    driver.process_messages();
    driver.transport_mut().deliver("C|A+");
    driver.process_messages();
    driver.login(b"{}".to_vec(), |_| {});
    driver.transport_mut().deliver("A|A+");
    driver.process_messages();
    assert_eq!(driver.state(), ConnectionState::Open);
    driver
}

#[test]
fn s4_event_round_trip() {
    let mut driver = driver_past_handshake("ws://h");
    driver.transport_mut().sent.clear();

    let received: Rc<RefCell<Option<Vec<u8>>>> = Rc::new(RefCell::new(None));
    let received_clone = received.clone();
    driver.subscribe("adam", move |data| *received_clone.borrow_mut() = Some(data.to_vec()));
    assert_eq!(driver.transport_mut().sent_human(), vec!["E|S|adam+"]);

    driver.transport_mut().sent.clear();
    driver.transport_mut().deliver("E|EVT|adam|Sbar+");
    driver.process_messages();
    assert_eq!(received.borrow().as_deref(), Some(&b"Sbar"[..]));

    let id = 0; // first id ever allocated on this driver
    driver.unsubscribe_one("adam", id);
    assert_eq!(driver.transport_mut().sent_human(), vec!["E|US|adam+"]);
}

#[test]
fn s5_listen_accept() {
    let mut driver = driver_past_handshake("ws://h");
    driver.transport_mut().sent.clear();

    driver.listen("foo.*", |_name| true);
    assert_eq!(driver.transport_mut().sent_human(), vec!["E|L|foo.*+"]);

    driver.transport_mut().sent.clear();
    driver.transport_mut().deliver("E|SP|foo.*|foo.1+");
    driver.process_messages();
    assert_eq!(driver.transport_mut().sent_human(), vec!["E|LA|foo.*|foo.1+"]);
}

#[test]
fn s6_presence_query_ordering() {
    let mut driver = driver_past_handshake("ws://h");
    driver.transport_mut().sent.clear();

    let seen_a: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let seen_b: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let a = seen_a.clone();
    let b = seen_b.clone();
    driver.get_all(move |users| *a.borrow_mut() = users.to_vec());
    driver.get_all(move |users| *b.borrow_mut() = users.to_vec());

    // Exactly one query sent for both pending calls.
    assert_eq!(driver.transport_mut().sent_human(), vec!["U|Q|Q+"]);

    driver.transport_mut().deliver("U|Q|u1|u2+");
    driver.process_messages();

    assert_eq!(seen_a.borrow().as_slice(), &["u1".to_string(), "u2".to_string()]);
    assert_eq!(seen_b.borrow().as_slice(), &["u1".to_string(), "u2".to_string()]);
}

#[test]
fn reconnect_idempotence_resends_exactly_one_subscribe_and_listen_per_live_registration() {
    let mut driver = driver_past_handshake("ws://h");
    driver.subscribe("adam", |_| {});
    driver.listen("foo.*", |_| true);
    driver.transport_mut().sent.clear();

    // Drop the socket; the driver reopens it, but resync must wait for the
    // handshake to reach OPEN again, not fire on the bare transport reopen.
    driver.transport_mut().deliver_closed();
    driver.process_messages();
    driver.process_messages(); // drains the reconnect's own Opened event
    assert!(driver.transport_mut().sent_human().is_empty());

    driver.transport_mut().deliver("C|CH+");
    driver.process_messages();
    driver.transport_mut().deliver("C|A+");
    driver.process_messages();
    driver.login(b"{}".to_vec(), |_| {});
    driver.transport_mut().deliver("A|A+");
    driver.process_messages();
    assert_eq!(driver.state(), ConnectionState::Open);

    let sent = driver.transport_mut().sent_human();
    assert_eq!(sent.iter().filter(|f| f.as_str() == "E|S|adam+").count(), 1);
    assert_eq!(sent.iter().filter(|f| f.as_str() == "E|L|foo.*+").count(), 1);
}

#[test]
fn reentrant_dispatch_unsubscribe_during_callback_does_not_skip_siblings() {
    let mut driver = driver_past_handshake("ws://h");
    let fired: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    let fired_a = fired.clone();
    driver.subscribe("adam", move |_data| {
        fired_a.borrow_mut().push("a");
    });

    let fired_b = fired.clone();
    driver.subscribe("adam", move |_data| {
        fired_b.borrow_mut().push("b");
    });

    driver.transport_mut().deliver("E|EVT|adam|Sx+");
    driver.process_messages();

    assert_eq!(fired.borrow().as_slice(), &["a", "b"]);
}

#[test]
fn subscription_ids_are_never_reused_across_event_and_presence() {
    let mut driver = ConnectionDriver::new(PseudoTransport::new(), options("ws://h"));
    driver.force_state(ConnectionState::Open);
    driver.transport_mut().open("ws://h");

    let mut ids = Vec::new();
    ids.push(driver.subscribe("a", |_| {}));
    ids.push(driver.presence_subscribe(|_, _| {}));
    ids.push(driver.subscribe("b", |_| {}));
    ids.push(driver.presence_subscribe(|_, _| {}));

    let mut sorted = ids.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), ids.len());
}
