//! # ASR Tools
//!
//! Shared library behind two small command-line tools:
//!
//! - **transcribe**: fetches a pretrained Whisper model from the HuggingFace
//!   hub, transcribes a local WAV file, and prints the transcript together
//!   with segment-level timestamps.
//! - **gpu-check**: probes the Candle compute runtime for CUDA availability
//!   and prints a diagnostic report.
//!
//! ## Module Layout:
//! - **config**: layered application configuration (defaults, config.toml,
//!   environment variables)
//! - **error**: the `AppError` type shared by all fallible operations
//! - **compat**: cross-platform process-termination signal constant
//! - **device**: compute device selection and accelerator probing
//! - **audio**: WAV loading, PCM normalization, mel feature support
//! - **transcription**: model download, Whisper inference, timestamps

pub mod audio;       // WAV loading and mel feature support (audio/ directory)
pub mod compat;      // Cross-platform signal constant (compat.rs)
pub mod config;      // Configuration management (config.rs)
pub mod device;      // Device detection and probing (device.rs)
pub mod error;       // Error handling types (error.rs)
pub mod transcription; // Whisper model and engine (transcription/ directory)

pub use config::AppConfig;
pub use device::{AcceleratorReport, DeviceManager, DevicePreference};
pub use error::{AppError, AppResult};
pub use transcription::{TranscriptionEngine, TranscriptionResult};
