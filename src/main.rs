use anyhow::Result;
use clap::{Parser, Subcommand};
use cpal::traits::{DeviceTrait, HostTrait};
use microphone_stream::{CaptureSource, Config, MicrophoneStream, RecorderConfig, WavRecorder};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "microphone-stream", version)]
#[command(about = "Microphone capture stream with audioData events")]
struct Cli {
    /// Config file (defaults apply when missing)
    #[arg(short, long, default_value = "config/microphone-stream")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List available input devices
    Devices,
    /// Print audioData events as they arrive
    Monitor {
        /// Capture duration in seconds
        #[arg(short, long, default_value_t = 10)]
        duration: u64,
        /// Print full events as JSON lines
        #[arg(long)]
        json: bool,
        /// Replay a WAV file instead of capturing the microphone
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Record the capture feed to rotating WAV chunks
    Record {
        /// Capture duration in seconds
        #[arg(short, long, default_value_t = 30)]
        duration: u64,
        /// Replay a WAV file instead of capturing the microphone
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Devices => list_devices(),
        Command::Monitor {
            duration,
            json,
            file,
        } => monitor(cfg, duration, json, file).await,
        Command::Record { duration, file } => record(cfg, duration, file).await,
    }
}

fn list_devices() -> Result<()> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    println!("Input devices:");
    for device in host.input_devices()? {
        let name = match device.name() {
            Ok(name) => name,
            Err(_) => continue,
        };

        if Some(&name) == default_name.as_ref() {
            println!("  * {} (default)", name);
        } else {
            println!("  - {}", name);
        }
    }

    Ok(())
}

async fn monitor(cfg: Config, duration: u64, json: bool, file: Option<PathBuf>) -> Result<()> {
    let stream = MicrophoneStream::from_source(source_for(file))?;

    let subscription = stream.add_listener(move |event| {
        if json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!("Failed to serialize event: {}", e),
            }
        } else {
            println!(
                "audioData #{}: {} base64 bytes ({}Hz, {}ch, {}-bit)",
                event.sequence,
                event.data.len(),
                event.sample_rate,
                event.channels,
                event.bits_per_channel
            );
        }
    });

    stream.init(cfg.capture.clone()).await?;
    stream.start().await?;

    tokio::time::sleep(Duration::from_secs(duration)).await;

    stream.stop().await?;
    subscription.unsubscribe();

    let stats = stream.stats().await;
    info!(
        "Delivered {} chunks over {:.1}s",
        stats.chunks_delivered, stats.uptime_secs
    );

    Ok(())
}

async fn record(cfg: Config, duration: u64, file: Option<PathBuf>) -> Result<()> {
    let stream = MicrophoneStream::from_source(source_for(file))?;

    let events = stream.events();
    let feed = events.handle();

    let recorder_config = RecorderConfig {
        chunk_duration_secs: cfg.output.chunk_duration_secs,
        output_dir: PathBuf::from(&cfg.output.recordings_path),
        recording_id: stream.id().to_string(),
    };
    let mut recorder = WavRecorder::new(recorder_config)?;

    let writer = tokio::spawn(async move { recorder.record(events).await });

    stream.init(cfg.capture.clone()).await?;
    stream.start().await?;

    tokio::time::sleep(Duration::from_secs(duration)).await;

    stream.stop().await?;

    // Detach the recorder's feed so it drains and finishes.
    feed.unsubscribe();

    let metadata = writer.await??;
    for chunk in &metadata {
        info!(
            "Saved chunk {}: {} ({} samples)",
            chunk.chunk_index,
            chunk.file_path.display(),
            chunk.sample_count
        );
    }

    Ok(())
}

fn source_for(file: Option<PathBuf>) -> CaptureSource {
    match file {
        Some(path) => CaptureSource::File(path),
        None => CaptureSource::Microphone,
    }
}
