use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use super::events::{AudioData, AUDIO_DATA_EVENT};

type Listener = Arc<dyn Fn(&AudioData) + Send + Sync>;
type Registry = Mutex<Vec<(u64, Listener)>>;

/// Subscription point for `audioData` events.
///
/// Listeners are invoked in registration order, once per emitted event,
/// with the payload as delivered; nothing is synthesized, filtered or
/// buffered here. An emission with no listeners registered is a no-op.
pub struct EventBridge {
    listeners: Arc<Registry>,
    next_id: AtomicU64,
    emitted: AtomicUsize,
}

impl EventBridge {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
            emitted: AtomicUsize::new(0),
        }
    }

    /// Register a listener for every subsequent `audioData` event.
    ///
    /// The returned handle revokes the registration; dropping it without
    /// calling `unsubscribe` leaves the listener registered.
    pub fn add_listener(&self, listener: impl Fn(&AudioData) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().push((id, Arc::new(listener)));

        debug!("Registered {} listener #{}", AUDIO_DATA_EVENT, id);

        Subscription {
            id,
            registry: Arc::downgrade(&self.listeners),
        }
    }

    /// Deliver one event to every registered listener, in registration order.
    pub fn emit(&self, event: &AudioData) {
        // Snapshot so listeners can touch the registry without deadlocking.
        let snapshot: Vec<Listener> = {
            let listeners = self.listeners.lock();
            listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };

        debug!(
            "Emitting {} #{} to {} listeners",
            AUDIO_DATA_EVENT,
            event.sequence,
            snapshot.len()
        );

        for listener in &snapshot {
            listener(event);
        }

        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Number of events emitted since creation.
    pub fn emitted_count(&self) -> usize {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Async view over the event feed, buffered up to `capacity` events.
    ///
    /// The bridge never blocks on a slow consumer: when the buffer is full
    /// the event is dropped for that stream (callback listeners are
    /// unaffected). The stream ends once its handle is unsubscribed and
    /// the buffer drains.
    pub fn stream(&self, capacity: usize) -> EventStream {
        let (tx, rx) = mpsc::channel(capacity);

        let subscription = self.add_listener(move |event: &AudioData| {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("Event stream consumer lagging, dropping chunk");
                }
                Err(TrySendError::Closed(_)) => {}
            }
        });

        EventStream { rx, subscription }
    }
}

impl Default for EventBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// Revocable handle for a registered listener.
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Remove the listener from the bridge. Safe to call repeatedly.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

/// `futures::Stream` adapter over a bridge subscription.
pub struct EventStream {
    rx: mpsc::Receiver<AudioData>,
    subscription: Subscription,
}

impl EventStream {
    /// Handle for detaching this stream from the bridge. After
    /// unsubscribing, the stream yields any buffered events and ends.
    pub fn handle(&self) -> Subscription {
        self.subscription.clone()
    }
}

impl Stream for EventStream {
    type Item = AudioData;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}
