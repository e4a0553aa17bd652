//! # Error Handling
//!
//! Defines the custom error type shared by the library and both binaries.
//!
//! ## Error Categories:
//! - **Config**: configuration file or environment variable problems
//! - **Audio**: unreadable, malformed, or unsupported audio input
//! - **Model**: model resolution, download, or weight-loading failures
//! - **Inference**: failures inside the Candle forward/decode passes
//! - **Device**: compute device construction failures
//!
//! ## Why custom errors:
//! Each variant names the stage that failed, so a crash of the demo
//! points directly at the responsible layer. Nothing is retried or
//! recovered; the binaries hold `anyhow::Result` at the very top and
//! let the chain print on exit.

use std::fmt;

/// Custom error type for the application.
#[derive(Debug)]
pub enum AppError {
    /// Configuration file or environment variable problems
    Config(String),

    /// Audio input could not be read or converted
    Audio(String),

    /// Model resolution, download, or loading failed
    Model(String),

    /// Inference (encoder/decoder forward or token decode) failed
    Inference(String),

    /// Compute device could not be constructed
    Device(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Audio(msg) => write!(f, "Audio error: {}", msg),
            AppError::Model(msg) => write!(f, "Model error: {}", msg),
            AppError::Inference(msg) => write!(f, "Inference error: {}", msg),
            AppError::Device(msg) => write!(f, "Device error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Automatic conversion from configuration loading errors.
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Automatic conversion from Candle tensor/device errors.
///
/// Candle reports both device construction and forward-pass failures
/// through one error type; the inference variant is the common case in
/// this codebase, and device probing maps errors explicitly where the
/// distinction matters.
impl From<candle_core::Error> for AppError {
    fn from(err: candle_core::Error) -> Self {
        AppError::Inference(err.to_string())
    }
}

/// Automatic conversion from JSON parsing errors (model config files).
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Model(format!("JSON parsing error: {}", err))
    }
}

/// Automatic conversion from HuggingFace hub API errors.
impl From<hf_hub::api::tokio::ApiError> for AppError {
    fn from(err: hf_hub::api::tokio::ApiError) -> Self {
        AppError::Model(format!("Hub download error: {}", err))
    }
}

/// Type alias for Results that use our custom error type.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_stage_and_message() {
        let err = AppError::Audio("bad sample rate".to_string());
        let text = err.to_string();
        assert!(text.contains("Audio error"));
        assert!(text.contains("bad sample rate"));
    }

    #[test]
    fn test_candle_error_converts_to_inference() {
        let candle_err = candle_core::Error::Msg("boom".to_string());
        let err: AppError = candle_err.into();
        assert!(matches!(err, AppError::Inference(_)));
    }
}
