use anyhow::{bail, Context, Result};
use hound::WavReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{CaptureBackend, CaptureOptions};
use crate::emitter::AudioData;

const CHUNK_CHANNEL_CAPACITY: usize = 32;

/// File replay backend
///
/// Stands in for the microphone where no capture hardware is available:
/// replays a WAV file through the same chunk pipeline, paced at the file's
/// real-time rate. Chunk size and bit depth come from the options; sample
/// rate and channel layout come from the file itself.
pub struct FileBackend {
    path: PathBuf,
    replay: Option<Replay>,
    capturing: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

struct Replay {
    chunks: Vec<AudioData>,
    chunk_duration: Duration,
    tx: mpsc::Sender<AudioData>,
    task: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            replay: None,
            capturing: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FileBackend {
    async fn init(&mut self, options: CaptureOptions) -> Result<mpsc::Receiver<AudioData>> {
        if self.capturing.load(Ordering::SeqCst) {
            bail!("Replay session already running");
        }

        if let Some(replay) = self.replay.take() {
            if let Some(task) = replay.task {
                task.abort();
            }
        }

        info!("Opening replay file: {}", self.path.display());

        let reader = WavReader::open(&self.path)
            .with_context(|| format!("Failed to open WAV file: {}", self.path.display()))?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Replay file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        let bit_depth = options.bit_depth();
        // A zero chunk size would never advance; treat it as one sample.
        let chunk_size = options.buffer_size.max(1);
        let chunks: Vec<AudioData> = samples
            .chunks(chunk_size)
            .enumerate()
            .map(|(i, chunk)| {
                AudioData::from_samples(chunk, spec.sample_rate, spec.channels, bit_depth, i as u32)
            })
            .collect();

        let chunk_duration = Duration::from_secs_f64(
            chunk_size as f64 / (spec.sample_rate as f64 * spec.channels as f64),
        );

        let (tx, rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);

        // Fresh flags per session so an aborted replay task cannot clobber
        // the new session's state.
        self.capturing = Arc::new(AtomicBool::new(false));
        self.paused = Arc::new(AtomicBool::new(false));
        self.replay = Some(Replay {
            chunks,
            chunk_duration,
            tx,
            task: None,
        });

        Ok(rx)
    }

    async fn start(&mut self) -> Result<()> {
        let replay = match &mut self.replay {
            Some(replay) => replay,
            None => bail!("File replay not initialized"),
        };

        self.paused.store(false, Ordering::SeqCst);
        self.capturing.store(true, Ordering::SeqCst);

        // First start spawns the pacing task; later starts just resume.
        if replay.task.is_none() {
            let chunks = std::mem::take(&mut replay.chunks);
            let tx = replay.tx.clone();
            let chunk_duration = replay.chunk_duration;
            let paused = Arc::clone(&self.paused);
            let capturing = Arc::clone(&self.capturing);

            info!(
                "File replay started: {} chunks, {:?} apart",
                chunks.len(),
                chunk_duration
            );

            let task = tokio::spawn(async move {
                for chunk in chunks {
                    while paused.load(Ordering::SeqCst) {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }

                    tokio::time::sleep(chunk_duration).await;

                    if tx.send(chunk).await.is_err() {
                        break;
                    }
                }

                capturing.store(false, Ordering::SeqCst);
                debug!("File replay complete");
            });

            replay.task = Some(task);
        }

        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        if self.replay.is_none() {
            return Ok(());
        }

        self.paused.store(true, Ordering::SeqCst);
        self.capturing.store(false, Ordering::SeqCst);

        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(replay) = self.replay.take() {
            if let Some(task) = replay.task {
                task.abort();
            }
            info!("File replay stopped");
        }

        self.paused.store(false, Ordering::SeqCst);
        self.capturing.store(false, Ordering::SeqCst);

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "file replay"
    }
}
