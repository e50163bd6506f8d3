use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::emitter::AudioData;

/// Options applied to a capture session at `init` time.
///
/// Every field is optional in serialized form; missing fields take the
/// defaults below. Values outside the supported range are coerced by the
/// backend (see `channel_layout` / `bit_depth`), not rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOptions {
    /// Sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Number of channels per frame (1 = mono, 2 = stereo)
    #[serde(default = "default_channels_per_frame")]
    pub channels_per_frame: u16,

    /// PCM bit depth (8 or 16)
    #[serde(default = "default_bits_per_channel")]
    pub bits_per_channel: u16,

    /// Samples per emitted audioData chunk
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Input device name (None = system default)
    #[serde(default)]
    pub device: Option<String>,
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_channels_per_frame() -> u16 {
    1
}

fn default_bits_per_channel() -> u16 {
    16
}

fn default_buffer_size() -> usize {
    8192
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels_per_frame: default_channels_per_frame(),
            bits_per_channel: default_bits_per_channel(),
            buffer_size: default_buffer_size(),
            device: None,
        }
    }
}

impl CaptureOptions {
    /// Channel layout the session will actually use.
    ///
    /// 2 selects stereo; every other value falls back to mono.
    pub fn channel_layout(&self) -> u16 {
        if self.channels_per_frame == 2 {
            2
        } else {
            1
        }
    }

    /// Bit depth the session will actually encode at.
    ///
    /// Only 8-bit and 16-bit PCM are supported; anything else falls back
    /// to 16-bit.
    pub fn bit_depth(&self) -> u16 {
        if self.bits_per_channel == 8 {
            8
        } else {
            16
        }
    }
}

/// Capture backend trait
///
/// The platform side of the stream: owns the device, the capture session
/// and its state machine. Implementations:
/// - Microphone: cpal input device (all platforms)
/// - File: WAV replay (for testing/batch processing)
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Apply options to a new capture session.
    ///
    /// Returns the channel on which the session delivers audioData chunks.
    /// The channel closes when the backend releases its sender, which
    /// `stop` must eventually cause.
    async fn init(&mut self, options: CaptureOptions) -> Result<mpsc::Receiver<AudioData>>;

    /// Begin delivering chunks.
    async fn start(&mut self) -> Result<()>;

    /// Suspend delivery without releasing the session.
    async fn pause(&mut self) -> Result<()>;

    /// Release the session and close the chunk channel.
    async fn stop(&mut self) -> Result<()>;

    /// Check if the backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Capture source type
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Microphone input (all platforms)
    Microphone,
    /// WAV file replay (for testing/batch processing)
    File(PathBuf),
}

/// Capture backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    /// Create a capture backend for the given source.
    pub fn create(source: CaptureSource) -> Result<Box<dyn CaptureBackend>> {
        match source {
            CaptureSource::Microphone => Ok(Box::new(super::microphone::MicrophoneBackend::new())),
            CaptureSource::File(path) => Ok(Box::new(super::file::FileBackend::new(path))),
        }
    }
}
