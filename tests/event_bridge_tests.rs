// Unit tests for the audioData event bridge
//
// These verify listener fan-out order, payload identity, subscription
// revocation, and the async stream adapter.

use anyhow::Result;
use futures::StreamExt;
use microphone_stream::{AudioData, EventBridge};
use parking_lot::Mutex;
use std::sync::Arc;

fn sample_event(sequence: u32) -> AudioData {
    AudioData::from_samples(&[100, -200, 300], 16000, 1, 16, sequence)
}

#[test]
fn listeners_fire_in_registration_order_with_payload() {
    let bridge = EventBridge::new();
    let seen: Arc<Mutex<Vec<(u8, AudioData)>>> = Arc::new(Mutex::new(Vec::new()));

    for tag in 1u8..=3 {
        let sink = Arc::clone(&seen);
        bridge.add_listener(move |event| sink.lock().push((tag, event.clone())));
    }

    let event = sample_event(7);
    bridge.emit(&event);

    let seen = seen.lock();
    assert_eq!(seen.len(), 3, "every listener fires exactly once");
    let tags: Vec<u8> = seen.iter().map(|(tag, _)| *tag).collect();
    assert_eq!(tags, vec![1, 2, 3], "registration order is preserved");
    for (_, payload) in seen.iter() {
        assert_eq!(payload, &event, "payload arrives unmodified");
    }
}

#[test]
fn every_listener_sees_every_event() {
    let bridge = EventBridge::new();
    let first: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let second: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&first);
    bridge.add_listener(move |event| sink.lock().push(event.sequence));
    let sink = Arc::clone(&second);
    bridge.add_listener(move |event| sink.lock().push(event.sequence));

    for sequence in 0..3 {
        bridge.emit(&sample_event(sequence));
    }

    assert_eq!(*first.lock(), vec![0, 1, 2]);
    assert_eq!(*second.lock(), vec![0, 1, 2]);
    assert_eq!(bridge.emitted_count(), 3);
}

#[test]
fn emit_without_listeners_is_a_noop() {
    let bridge = EventBridge::new();

    // Nothing registered: no crash, and nothing is replayed later.
    bridge.emit(&sample_event(0));

    let seen: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bridge.add_listener(move |event| sink.lock().push(event.sequence));

    assert!(seen.lock().is_empty(), "late listeners see no buffered events");
    assert_eq!(bridge.emitted_count(), 1);
}

#[test]
fn unsubscribe_detaches_and_is_idempotent() {
    let bridge = EventBridge::new();
    let first: Arc<Mutex<usize>> = Arc::new(Mutex::new(0));
    let second: Arc<Mutex<usize>> = Arc::new(Mutex::new(0));

    let sink = Arc::clone(&first);
    let subscription = bridge.add_listener(move |_| *sink.lock() += 1);
    let sink = Arc::clone(&second);
    bridge.add_listener(move |_| *sink.lock() += 1);

    assert_eq!(bridge.listener_count(), 2);

    subscription.unsubscribe();
    subscription.unsubscribe(); // repeated release is safe

    assert_eq!(bridge.listener_count(), 1);

    bridge.emit(&sample_event(0));

    assert_eq!(*first.lock(), 0, "unsubscribed listener stays silent");
    assert_eq!(*second.lock(), 1);
}

#[tokio::test]
async fn stream_adapter_yields_events_in_order() -> Result<()> {
    let bridge = EventBridge::new();
    let mut events = bridge.stream(4);

    let e0 = sample_event(0);
    let e1 = sample_event(1);
    bridge.emit(&e0);
    bridge.emit(&e1);

    assert_eq!(events.next().await, Some(e0));
    assert_eq!(events.next().await, Some(e1));

    // Detached stream drains and ends.
    events.handle().unsubscribe();
    assert_eq!(events.next().await, None);

    Ok(())
}

#[tokio::test]
async fn slow_stream_consumer_drops_without_affecting_listeners() -> Result<()> {
    let bridge = EventBridge::new();

    let seen: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bridge.add_listener(move |event| sink.lock().push(event.sequence));

    let mut events = bridge.stream(1);

    let e0 = sample_event(0);
    let e1 = sample_event(1);
    bridge.emit(&e0);
    bridge.emit(&e1); // buffer full: dropped for the stream only

    events.handle().unsubscribe();

    assert_eq!(events.next().await, Some(e0));
    assert_eq!(events.next().await, None);

    assert_eq!(*seen.lock(), vec![0, 1], "callback listeners miss nothing");

    Ok(())
}
