use anyhow::{Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Name of the event stream carrying captured audio chunks.
pub const AUDIO_DATA_EVENT: &str = "audioData";

/// A single captured audio chunk, delivered once per emission to every
/// registered listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioData {
    /// Base64-encoded PCM bytes
    pub data: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// Bit depth of the PCM bytes in `data` (8 or 16)
    pub bits_per_channel: u16,
    /// Chunk counter, monotonic within a capture session
    pub sequence: u32,
    /// RFC3339 timestamp
    pub timestamp: String,
}

impl AudioData {
    /// Encode a chunk of samples at the given bit depth.
    ///
    /// 16-bit chunks carry little-endian signed PCM; 8-bit chunks carry
    /// unsigned PCM with a 128 offset, truncated from the high byte.
    pub fn from_samples(
        samples: &[i16],
        sample_rate: u32,
        channels: u16,
        bits_per_channel: u16,
        sequence: u32,
    ) -> Self {
        let pcm_bytes: Vec<u8> = if bits_per_channel == 8 {
            samples.iter().map(|&s| ((s >> 8) + 128) as u8).collect()
        } else {
            samples.iter().flat_map(|s| s.to_le_bytes()).collect()
        };

        Self {
            data: base64::engine::general_purpose::STANDARD.encode(&pcm_bytes),
            sample_rate,
            channels,
            bits_per_channel,
            sequence,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Decode the payload back to raw PCM bytes.
    pub fn pcm_bytes(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .context("Failed to decode audio chunk payload")
    }

    /// Decode the payload to i16 samples, widening 8-bit chunks.
    pub fn samples(&self) -> Result<Vec<i16>> {
        let bytes = self.pcm_bytes()?;

        let samples = if self.bits_per_channel == 8 {
            bytes.iter().map(|&b| (b as i16 - 128) << 8).collect()
        } else {
            bytes
                .chunks_exact(2)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                .collect()
        };

        Ok(samples)
    }
}
