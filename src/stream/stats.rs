use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a capture stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamStats {
    /// Whether the backend is currently capturing
    pub is_capturing: bool,

    /// When the stream was created
    pub created_at: DateTime<Utc>,

    /// Seconds since the stream was created
    pub uptime_secs: f64,

    /// Number of audioData events delivered so far
    pub chunks_delivered: usize,

    /// Number of registered listeners
    pub listeners: usize,
}
