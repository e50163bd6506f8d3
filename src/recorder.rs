use anyhow::{Context, Result};
use futures::{Stream, StreamExt};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::emitter::AudioData;

/// Recorder configuration
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Duration of each chunk in seconds (default: 300 = 5 minutes)
    pub chunk_duration_secs: u64,
    /// Output directory for chunk files
    pub output_dir: PathBuf,
    /// Recording ID (used for chunk filenames)
    pub recording_id: String,
}

impl RecorderConfig {
    pub fn new(recording_id: String, output_dir: PathBuf) -> Self {
        Self {
            chunk_duration_secs: 300, // 5 minutes default
            output_dir,
            recording_id,
        }
    }
}

/// Metadata for a single recorded chunk
#[derive(Debug, Clone)]
pub struct ChunkMetadata {
    /// Chunk number (0-indexed)
    pub chunk_index: usize,
    /// File path to the chunk
    pub file_path: PathBuf,
    /// Start offset in milliseconds since the recording began
    pub start_ms: u64,
    /// End offset in milliseconds since the recording began
    pub end_ms: u64,
    /// Sample rate
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Number of samples in this chunk
    pub sample_count: usize,
}

/// WAV recorder
///
/// Consumes an audioData feed and saves it to disk in fixed-duration WAV
/// chunks. Offsets are derived from the accumulated sample time of the
/// decoded payloads.
pub struct WavRecorder {
    config: RecorderConfig,
    current_chunk: Option<ChunkWriter>,
    chunk_index: usize,
    position_ms: u64,
}

impl WavRecorder {
    pub fn new(config: RecorderConfig) -> Result<Self> {
        fs::create_dir_all(&config.output_dir).context("Failed to create output directory")?;

        info!(
            "WAV recorder initialized: {} (chunks: {}s each)",
            config.recording_id, config.chunk_duration_secs
        );

        Ok(Self {
            config,
            current_chunk: None,
            chunk_index: 0,
            position_ms: 0,
        })
    }

    /// Consume events until the feed ends, writing rotating WAV chunks.
    pub async fn record<S>(&mut self, mut events: S) -> Result<Vec<ChunkMetadata>>
    where
        S: Stream<Item = AudioData> + Unpin,
    {
        let mut metadata = Vec::new();

        info!("Starting WAV recording: {}", self.config.recording_id);

        while let Some(event) = events.next().await {
            let samples = event.samples().context("Failed to decode audio chunk")?;
            if samples.is_empty() {
                continue;
            }

            let event_ms =
                samples.len() as u64 * 1000 / (event.sample_rate as u64 * event.channels as u64);

            // Check if we need to start a new chunk
            if self.should_start_new_chunk() {
                if let Some(chunk) = self.current_chunk.take() {
                    let chunk_meta = chunk.finish()?;
                    info!(
                        "Chunk {} complete: {:.1}s - {:.1}s ({} samples)",
                        chunk_meta.chunk_index,
                        chunk_meta.start_ms as f64 / 1000.0,
                        chunk_meta.end_ms as f64 / 1000.0,
                        chunk_meta.sample_count
                    );
                    metadata.push(chunk_meta);
                }

                self.current_chunk = Some(self.start_new_chunk(&event)?);
            }

            if let Some(chunk) = &mut self.current_chunk {
                chunk.write_samples(&samples, self.position_ms + event_ms)?;
            }

            self.position_ms += event_ms;
        }

        // Finish final chunk
        if let Some(chunk) = self.current_chunk.take() {
            let chunk_meta = chunk.finish()?;
            info!(
                "Final chunk {} complete: {:.1}s - {:.1}s ({} samples)",
                chunk_meta.chunk_index,
                chunk_meta.start_ms as f64 / 1000.0,
                chunk_meta.end_ms as f64 / 1000.0,
                chunk_meta.sample_count
            );
            metadata.push(chunk_meta);
        }

        info!("WAV recording complete: {} chunks saved", metadata.len());

        Ok(metadata)
    }

    fn should_start_new_chunk(&self) -> bool {
        match &self.current_chunk {
            None => true, // No current chunk, start one
            Some(chunk) => {
                // Check if chunk duration exceeded
                let chunk_duration_ms = self.config.chunk_duration_secs * 1000;
                let elapsed_ms = self.position_ms - chunk.metadata.start_ms;
                elapsed_ms >= chunk_duration_ms
            }
        }
    }

    fn start_new_chunk(&mut self, event: &AudioData) -> Result<ChunkWriter> {
        let chunk_path = self.config.output_dir.join(format!(
            "{}-chunk-{:03}.wav",
            self.config.recording_id, self.chunk_index
        ));

        let chunk = ChunkWriter::new(
            chunk_path,
            self.chunk_index,
            self.position_ms,
            event.sample_rate,
            event.channels,
        )?;

        self.chunk_index += 1;

        Ok(chunk)
    }
}

/// Writes a single chunk to disk as a WAV file
struct ChunkWriter {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    metadata: ChunkMetadata,
}

impl ChunkWriter {
    fn new(
        file_path: PathBuf,
        chunk_index: usize,
        start_ms: u64,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&file_path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", file_path))?;

        Ok(Self {
            writer: Some(writer),
            metadata: ChunkMetadata {
                chunk_index,
                file_path,
                start_ms,
                end_ms: start_ms,
                sample_rate,
                channels,
                sample_count: 0,
            },
        })
    }

    fn write_samples(&mut self, samples: &[i16], end_ms: u64) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            for &sample in samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }

            self.metadata.end_ms = end_ms;
            self.metadata.sample_count += samples.len();
        }

        Ok(())
    }

    fn finish(mut self) -> Result<ChunkMetadata> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().context("Failed to finalize WAV file")?;
        }

        Ok(self.metadata.clone())
    }
}

impl Drop for ChunkWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}
