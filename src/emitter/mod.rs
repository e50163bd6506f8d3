pub mod bridge;
pub mod events;

pub use bridge::{EventBridge, EventStream, Subscription};
pub use events::{AudioData, AUDIO_DATA_EVENT};
