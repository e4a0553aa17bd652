//! # Transcription Module
//!
//! Speech-to-text via Whisper checkpoints running on Candle, a pure
//! Rust stack with no FFI bindings to whisper.cpp.
//!
//! ## Key Components:
//! - **Model Management**: resolving, fetching, and loading checkpoints
//! - **Transcription Engine**: the invoker facade assembling results
//! - **Timestamps**: parsing timestamp tokens and deriving the word-
//!   and character-level collections

pub mod engine;      // Transcription facade and result types
pub mod model;       // Whisper model loading and decode
pub mod timestamps;  // Timestamp records and derivation

pub use engine::{format_timestamp_line, TimestampBundle, TranscriptionEngine, TranscriptionResult};
pub use model::{ModelSize, ModelSpec, TranscribeOptions, WhisperModel};
pub use timestamps::TimedSpan;
