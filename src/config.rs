use anyhow::Result;
use serde::Deserialize;

use crate::capture::CaptureOptions;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub capture: CaptureOptions,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_recordings_path")]
    pub recordings_path: String,
    #[serde(default = "default_chunk_duration_secs")]
    pub chunk_duration_secs: u64,
}

fn default_service_name() -> String {
    "microphone-stream".to_string()
}

fn default_recordings_path() -> String {
    "recordings".to_string()
}

fn default_chunk_duration_secs() -> u64 {
    300
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            recordings_path: default_recordings_path(),
            chunk_duration_secs: default_chunk_duration_secs(),
        }
    }
}

impl Config {
    /// Load settings from a config file; a missing file yields defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
