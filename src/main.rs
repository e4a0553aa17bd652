//! # Transcription Demo - Main Entry Point
//!
//! Fetches the configured Whisper checkpoint from the HuggingFace hub,
//! transcribes the configured WAV file, and prints:
//!
//! 1. the plain transcript, then
//! 2. one line per segment-level timestamp record, formatted
//!    `{start}s - {end}s : {segment text}`.
//!
//! There are no command-line flags; behavior comes from the
//! configuration layer (defaults, `config.toml`, `APP_*` environment
//! variables). Logs go to stderr so stdout carries only the transcript.
//! Failures such as a missing audio file or an unreachable hub
//! propagate and exit non-zero.

use anyhow::Result;
use asr_tools::audio;
use asr_tools::config::AppConfig;
use asr_tools::device::DeviceManager;
use asr_tools::transcription::{format_timestamp_line, ModelSpec, TranscriptionEngine};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present (HF_TOKEN etc.)
    dotenv::dotenv().ok();

    init_tracing();

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting asr-tools transcribe v{}", env!("CARGO_PKG_VERSION"));
    debug!("Effective configuration:\n{}", config.to_toml()?);

    let device = DeviceManager::from_config_string(&config.device.preference)?;
    info!("Using device: {}", DeviceManager::describe_device(&device));

    let spec = ModelSpec::parse(&config.model.id);
    let mut engine = TranscriptionEngine::new(config.language().map(str::to_string), device);
    engine.load_model(&spec).await?;

    let buffer = audio::load_wav(&config.audio.path)?;
    info!(
        "Audio: {:.1}s, {} Hz, {} channel(s)",
        buffer.duration(),
        buffer.sample_rate,
        buffer.channels
    );

    // First pass: plain transcript.
    let plain = engine.transcribe(&buffer, false)?;
    println!("{}", plain.text);

    // Second pass: timestamps enabled; print every segment record in order.
    let stamped = engine.transcribe(&buffer, true)?;
    if let Some(bundle) = &stamped.timestamps {
        for segment in &bundle.segments {
            println!("{}", format_timestamp_line(segment));
        }
    }

    Ok(())
}

/// Route structured logs to stderr, leaving stdout to the transcript.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "asr_tools=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
