//! # Configuration Management
//!
//! This module handles loading application configuration from multiple
//! sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! Neither binary takes command-line flags; everything they do is
//! determined by this configuration. The defaults reproduce the demo
//! behavior out of the box (Whisper base model, `test_audio.wav` in the
//! working directory, automatic device selection).
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_MODEL_ID, APP_AUDIO_PATH, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)

use crate::device::DevicePreference;
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub audio: AudioConfig,
    pub device: DeviceConfig,
}

/// ASR model configuration settings.
///
/// ## Fields:
/// - `id`: which pretrained model to fetch. Either a Whisper size alias
///   ("tiny", "base", "small", "medium", "large") or a full HuggingFace
///   repo id such as "openai/whisper-base"
/// - `language`: ISO 639-1 language hint for multilingual checkpoints;
///   an empty string means auto-detect (no language token is forced)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    pub language: String,
}

/// Audio input configuration.
///
/// ## Fields:
/// - `path`: WAV file to transcribe, relative to the working directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub path: String,
}

/// Compute device configuration.
///
/// ## Fields:
/// - `preference`: "auto", "cpu", "cuda", or "metal"; see
///   [`DevicePreference`](crate::device::DevicePreference)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub preference: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig {
                id: "base".to_string(),        // Good balance for a demo
                language: "en".to_string(),
            },
            audio: AudioConfig {
                path: "test_audio.wav".to_string(),
            },
            device: DeviceConfig {
                preference: "auto".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle the short-form ASR_MODEL / ASR_AUDIO variables
    pub fn load() -> AppResult<Self> {
        let mut settings = config::Config::builder()
            // 1. Start with defaults - converts our Default impl to config format
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // 2. Load from config.toml file (if it exists)
            .add_source(config::File::with_name("config").required(false))
            // 3. Load from environment variables with APP_ prefix
            // Example: APP_MODEL_ID becomes model.id in the config
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Short-form variables for the two settings people actually flip
        // when running the demo against a different model or recording.
        if let Ok(model_id) = env::var("ASR_MODEL") {
            settings = settings.set_override("model.id", model_id)?;
        }

        if let Ok(audio_path) = env::var("ASR_AUDIO") {
            settings = settings.set_override("audio.path", audio_path)?;
        }

        // Build the final configuration and convert it back to our AppConfig struct
        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - The model identifier is non-empty
    /// - The audio path is non-empty
    /// - The device preference parses to a known value
    pub fn validate(&self) -> AppResult<()> {
        if self.model.id.trim().is_empty() {
            return Err(AppError::Config("Model identifier cannot be empty".to_string()));
        }

        if self.audio.path.trim().is_empty() {
            return Err(AppError::Config("Audio path cannot be empty".to_string()));
        }

        self.device
            .preference
            .parse::<DevicePreference>()
            .map_err(AppError::Config)?;

        Ok(())
    }

    /// The language hint, with the empty string mapped to auto-detect.
    pub fn language(&self) -> Option<&str> {
        let lang = self.model.language.trim();
        if lang.is_empty() {
            None
        } else {
            Some(lang)
        }
    }

    /// Render the effective configuration as TOML (for startup logging).
    pub fn to_toml(&self) -> AppResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("Cannot serialize configuration: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The default configuration is valid and has the demo values.
    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.model.id, "base");
        assert_eq!(config.audio.path, "test_audio.wav");
        assert_eq!(config.device.preference, "auto");
        assert!(config.validate().is_ok());
    }

    /// Validation catches empty identifiers and unknown devices.
    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.model.id = "".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.audio.path = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.device.preference = "quantum".to_string();
        assert!(config.validate().is_err());
    }

    /// An empty language hint means auto-detect.
    #[test]
    fn test_language_hint() {
        let mut config = AppConfig::default();
        assert_eq!(config.language(), Some("en"));
        config.model.language = "".to_string();
        assert_eq!(config.language(), None);
    }

    /// The effective configuration round-trips through TOML.
    #[test]
    fn test_to_toml_round_trip() {
        let config = AppConfig::default();
        let rendered = config.to_toml().unwrap();
        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.model.id, config.model.id);
        assert_eq!(parsed.audio.path, config.audio.path);
    }
}
