pub mod capture;
pub mod config;
pub mod emitter;
pub mod recorder;
pub mod stream;

pub use capture::{
    CaptureBackend, CaptureBackendFactory, CaptureOptions, CaptureSource, FileBackend,
    MicrophoneBackend,
};
pub use config::Config;
pub use emitter::{AudioData, EventBridge, EventStream, Subscription, AUDIO_DATA_EVENT};
pub use recorder::{ChunkMetadata, RecorderConfig, WavRecorder};
pub use stream::{MicrophoneStream, StreamStats};
