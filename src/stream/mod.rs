//! Capture stream façade
//!
//! This module provides the `MicrophoneStream` binding that:
//! - Forwards init/start/pause/stop to a capture backend
//! - Delivers the backend's audioData events to registered listeners
//! - Exposes stream statistics

mod stats;
mod stream;

pub use stats::StreamStats;
pub use stream::MicrophoneStream;
