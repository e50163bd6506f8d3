pub mod backend;
pub mod file;
pub mod microphone;

pub use backend::{CaptureBackend, CaptureBackendFactory, CaptureOptions, CaptureSource};
pub use file::FileBackend;
pub use microphone::MicrophoneBackend;
