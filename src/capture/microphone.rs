use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::backend::{CaptureBackend, CaptureOptions};
use crate::emitter::AudioData;

/// Chunks buffered between the capture thread and the forwarding side.
const CHUNK_CHANNEL_CAPACITY: usize = 32;

enum WorkerCommand {
    Start { reply: oneshot::Sender<Result<()>> },
    Pause { reply: oneshot::Sender<Result<()>> },
    Shutdown,
}

/// Microphone backend
///
/// Captures from a cpal input device. The stream handle is not `Send`, so
/// a dedicated thread owns it for the lifetime of the session and lifecycle
/// calls talk to that thread over a command channel. `init` opens the
/// device, `start`/`pause` toggle the stream, `stop` releases everything.
pub struct MicrophoneBackend {
    worker: Option<Worker>,
    capturing: Arc<AtomicBool>,
}

struct Worker {
    commands: mpsc::UnboundedSender<WorkerCommand>,
    _handle: JoinHandle<()>,
}

impl MicrophoneBackend {
    pub fn new() -> Self {
        Self {
            worker: None,
            capturing: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for MicrophoneBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn init(&mut self, options: CaptureOptions) -> Result<mpsc::Receiver<AudioData>> {
        if self.capturing.load(Ordering::SeqCst) {
            bail!("Capture session already running");
        }

        // An idle session from an earlier init is released and rebuilt.
        if let Some(worker) = self.worker.take() {
            let _ = worker.commands.send(WorkerCommand::Shutdown);
        }

        info!(
            "Initializing microphone capture ({}Hz, {} channels, {}-bit, {} samples/chunk)",
            options.sample_rate,
            options.channel_layout(),
            options.bit_depth(),
            options.buffer_size
        );

        let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        // Fresh flag per session so a worker being torn down cannot clobber
        // the new session's state.
        self.capturing = Arc::new(AtomicBool::new(false));
        let capturing = Arc::clone(&self.capturing);

        let handle = thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || capture_worker(options, chunk_tx, command_rx, ready_tx, capturing))
            .context("Failed to spawn capture thread")?;

        ready_rx
            .await
            .context("Capture thread exited before reporting status")??;

        self.worker = Some(Worker {
            commands: command_tx,
            _handle: handle,
        });

        info!("Microphone capture initialized");

        Ok(chunk_rx)
    }

    async fn start(&mut self) -> Result<()> {
        let worker = match &self.worker {
            Some(worker) => worker,
            None => bail!("Microphone capture not initialized"),
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        worker
            .commands
            .send(WorkerCommand::Start { reply: reply_tx })
            .map_err(|_| anyhow!("Capture thread is gone"))?;

        reply_rx
            .await
            .context("Capture thread dropped the start request")?
    }

    async fn pause(&mut self) -> Result<()> {
        // Pausing a session that was never initialized is a no-op.
        let worker = match &self.worker {
            Some(worker) => worker,
            None => return Ok(()),
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        worker
            .commands
            .send(WorkerCommand::Pause { reply: reply_tx })
            .map_err(|_| anyhow!("Capture thread is gone"))?;

        reply_rx
            .await
            .context("Capture thread dropped the pause request")?
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(worker) = self.worker.take() {
            let _ = worker.commands.send(WorkerCommand::Shutdown);
            info!("Microphone capture stopped");
        }

        self.capturing.store(false, Ordering::SeqCst);

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "microphone (cpal)"
    }
}

/// Owns the cpal stream; exits when told to shut down or when the backend
/// drops the command sender.
fn capture_worker(
    options: CaptureOptions,
    chunks: mpsc::Sender<AudioData>,
    mut commands: mpsc::UnboundedReceiver<WorkerCommand>,
    ready: oneshot::Sender<Result<()>>,
    capturing: Arc<AtomicBool>,
) {
    let stream = match build_input_stream(&options, chunks) {
        Ok(stream) => {
            let _ = ready.send(Ok(()));
            stream
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    while let Some(command) = commands.blocking_recv() {
        match command {
            WorkerCommand::Start { reply } => {
                let result = stream.play().context("Failed to start input stream");
                if result.is_ok() {
                    capturing.store(true, Ordering::SeqCst);
                }
                let _ = reply.send(result);
            }
            WorkerCommand::Pause { reply } => {
                let result = stream.pause().context("Failed to pause input stream");
                if result.is_ok() {
                    capturing.store(false, Ordering::SeqCst);
                }
                let _ = reply.send(result);
            }
            WorkerCommand::Shutdown => break,
        }
    }

    capturing.store(false, Ordering::SeqCst);
    drop(stream);

    debug!("Capture thread exiting");
}

fn build_input_stream(
    options: &CaptureOptions,
    chunks: mpsc::Sender<AudioData>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();

    let device = match &options.device {
        Some(name) => host
            .input_devices()
            .context("Failed to enumerate input devices")?
            .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
            .with_context(|| format!("Input device not found: {}", name))?,
        None => host
            .default_input_device()
            .context("No default input device")?,
    };

    info!("Using input device: {:?}", device.name());

    let sample_format = device
        .default_input_config()
        .context("Failed to query device input config")?
        .sample_format();

    let stream_config = StreamConfig {
        channels: options.channel_layout(),
        sample_rate: cpal::SampleRate(options.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = match sample_format {
        SampleFormat::F32 => {
            let mut encoder = ChunkEncoder::new(options, chunks);
            device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| encoder.push_f32(data),
                    |err| warn!("Input stream error: {}", err),
                    None,
                )
                .context("Failed to build input stream")?
        }
        SampleFormat::I16 => {
            let mut encoder = ChunkEncoder::new(options, chunks);
            device
                .build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| encoder.push_i16(data),
                    |err| warn!("Input stream error: {}", err),
                    None,
                )
                .context("Failed to build input stream")?
        }
        other => bail!("Unsupported sample format: {:?}", other),
    };

    Ok(stream)
}

/// Accumulates callback samples and sends one encoded chunk per
/// `buffer_size` samples collected.
struct ChunkEncoder {
    pending: Vec<i16>,
    buffer_size: usize,
    sample_rate: u32,
    channels: u16,
    bits_per_channel: u16,
    sequence: u32,
    chunks: mpsc::Sender<AudioData>,
}

impl ChunkEncoder {
    fn new(options: &CaptureOptions, chunks: mpsc::Sender<AudioData>) -> Self {
        // A zero chunk size would never flush; treat it as one sample.
        let buffer_size = options.buffer_size.max(1);

        Self {
            pending: Vec::with_capacity(buffer_size * 2),
            buffer_size,
            sample_rate: options.sample_rate,
            channels: options.channel_layout(),
            bits_per_channel: options.bit_depth(),
            sequence: 0,
            chunks,
        }
    }

    fn push_f32(&mut self, data: &[f32]) {
        self.pending.extend(
            data.iter()
                .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
        );
        self.flush_ready();
    }

    fn push_i16(&mut self, data: &[i16]) {
        self.pending.extend_from_slice(data);
        self.flush_ready();
    }

    fn flush_ready(&mut self) {
        while self.pending.len() >= self.buffer_size {
            let chunk: Vec<i16> = self.pending.drain(..self.buffer_size).collect();

            let event = AudioData::from_samples(
                &chunk,
                self.sample_rate,
                self.channels,
                self.bits_per_channel,
                self.sequence,
            );
            self.sequence = self.sequence.wrapping_add(1);

            match self.chunks.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("Chunk consumer lagging, dropping audio chunk");
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
    }
}
