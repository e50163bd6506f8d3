use super::stats::StreamStats;
use crate::capture::{CaptureBackend, CaptureBackendFactory, CaptureOptions, CaptureSource};
use crate::emitter::{AudioData, EventBridge, EventStream, Subscription};
use anyhow::Result;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Buffering for `events()` stream consumers.
const EVENT_STREAM_CAPACITY: usize = 64;

/// Binding over a capture backend: four forwarded lifecycle calls and one
/// event subscription point.
///
/// Every call is handed to the backend as-is, and whatever the backend
/// returns or raises surfaces unchanged. Sequencing rules (init before
/// start, pause only while capturing) are the backend's own business;
/// nothing is checked or tracked here.
pub struct MicrophoneStream {
    /// Stream identifier, used only for logging
    stream_id: String,

    /// The capture backend all lifecycle calls forward to
    backend: Mutex<Box<dyn CaptureBackend>>,

    /// Subscription point delivering the backend's audioData events
    bridge: Arc<EventBridge>,

    /// When the stream was created
    created_at: chrono::DateTime<Utc>,

    /// Number of chunks delivered to the bridge
    chunks_delivered: Arc<AtomicUsize>,

    /// Handle for the chunk forwarding task
    forward_task: Mutex<Option<JoinHandle<()>>>,
}

impl MicrophoneStream {
    /// Create a stream over an explicit backend and event bridge.
    pub fn new(backend: Box<dyn CaptureBackend>, bridge: Arc<EventBridge>) -> Self {
        let stream_id = format!("mic-{}", uuid::Uuid::new_v4());

        info!("Creating capture stream: {} ({})", stream_id, backend.name());

        Self {
            stream_id,
            backend: Mutex::new(backend),
            bridge,
            created_at: Utc::now(),
            chunks_delivered: Arc::new(AtomicUsize::new(0)),
            forward_task: Mutex::new(None),
        }
    }

    /// Default microphone stream with its own event bridge.
    pub fn open() -> Result<Self> {
        Self::from_source(CaptureSource::Microphone)
    }

    /// Stream over any capture source, with its own event bridge.
    pub fn from_source(source: CaptureSource) -> Result<Self> {
        let backend = CaptureBackendFactory::create(source)?;
        Ok(Self::new(backend, Arc::new(EventBridge::new())))
    }

    /// Forward capture options to the backend and wire its chunk feed to
    /// the event bridge.
    ///
    /// Options are handed over verbatim; out-of-range values are coerced
    /// by the backend rather than rejected here.
    // TODO: reject unsupported bit depths and channel counts at this
    // boundary instead of relying on backend coercion.
    pub async fn init(&self, options: CaptureOptions) -> Result<()> {
        let mut rx = self.backend.lock().await.init(options).await?;

        let bridge = Arc::clone(&self.bridge);
        let chunks_delivered = Arc::clone(&self.chunks_delivered);
        let stream_id = self.stream_id.clone();

        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                chunks_delivered.fetch_add(1, Ordering::Relaxed);
                bridge.emit(&event);
            }
            debug!("Chunk forwarding ended for {}", stream_id);
        });

        // A fresh init replaces the previous session's feed.
        if let Some(old) = self.forward_task.lock().await.replace(task) {
            old.abort();
        }

        Ok(())
    }

    /// Forward a start request to the backend.
    pub async fn start(&self) -> Result<()> {
        self.backend.lock().await.start().await
    }

    /// Forward a pause request to the backend.
    pub async fn pause(&self) -> Result<()> {
        self.backend.lock().await.pause().await
    }

    /// Forward a stop request to the backend and wait for the event feed
    /// to drain.
    pub async fn stop(&self) -> Result<()> {
        self.backend.lock().await.stop().await?;

        // Stopping releases the backend's sender; the forwarder finishes
        // once the channel drains.
        if let Some(task) = self.forward_task.lock().await.take() {
            let _ = task.await;
        }

        Ok(())
    }

    /// Register a callback invoked once per `audioData` event.
    pub fn add_listener(
        &self,
        listener: impl Fn(&AudioData) + Send + Sync + 'static,
    ) -> Subscription {
        self.bridge.add_listener(listener)
    }

    /// Async view over the event feed.
    pub fn events(&self) -> EventStream {
        self.bridge.stream(EVENT_STREAM_CAPACITY)
    }

    /// The event bridge this stream emits on.
    pub fn bridge(&self) -> &Arc<EventBridge> {
        &self.bridge
    }

    /// Stream identifier, used in logs and recording filenames.
    pub fn id(&self) -> &str {
        &self.stream_id
    }

    /// Current stream statistics.
    pub async fn stats(&self) -> StreamStats {
        let is_capturing = self.backend.lock().await.is_capturing();
        let uptime = Utc::now().signed_duration_since(self.created_at);

        StreamStats {
            is_capturing,
            created_at: self.created_at,
            uptime_secs: uptime.num_milliseconds() as f64 / 1000.0,
            chunks_delivered: self.chunks_delivered.load(Ordering::Relaxed),
            listeners: self.bridge.listener_count(),
        }
    }
}
