//! # Transcription Engine
//!
//! The invoker facade over the Whisper model: validates input audio,
//! runs transcription passes, and assembles the result record with the
//! three timestamp collections (character, word, segment) plus timing
//! metadata.

use crate::audio::{self, AudioBuffer};
use crate::error::{AppError, AppResult};
use crate::transcription::model::{ModelSpec, TranscribeOptions, WhisperModel};
use crate::transcription::timestamps::{self, TimedSpan};
use candle_core::Device;
use std::time::Instant;
use tracing::{info, warn};

/// Result of a transcription operation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TranscriptionResult {
    /// The transcribed text
    pub text: String,

    /// Model used for transcription (hub repo id)
    pub model_name: String,

    /// Language hint in effect, if any
    pub language: Option<String>,

    /// Duration of audio processed (seconds)
    pub audio_duration_secs: f64,

    /// Time taken for inference (seconds)
    pub inference_time_secs: f64,

    /// Real-time factor (inference time / audio duration; below 1.0 is
    /// faster than real time)
    pub rtf: f64,

    /// Timestamp collections, present when timestamps were requested
    pub timestamps: Option<TimestampBundle>,
}

/// The three parallel timestamp collections of a timestamped pass.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TimestampBundle {
    /// Character-level records
    pub chars: Vec<TimedSpan>,

    /// Word-level records
    pub words: Vec<TimedSpan>,

    /// Segment-level records
    pub segments: Vec<TimedSpan>,
}

impl TimestampBundle {
    /// Derive the word- and character-level collections from the
    /// segment records.
    pub fn from_segments(segments: Vec<TimedSpan>) -> Self {
        let words = segments.iter().flat_map(timestamps::words_from_segment).collect();
        let chars = segments.iter().flat_map(timestamps::chars_from_segment).collect();
        Self {
            chars,
            words,
            segments,
        }
    }
}

/// Render a segment record the way the demo prints it.
pub fn format_timestamp_line(span: &TimedSpan) -> String {
    format!("{:.2}s - {:.2}s : {}", span.start, span.end, span.text)
}

/// High-level transcription engine that owns the loaded model.
///
/// Execution is sequential: one model, one pass at a time, matching the
/// demo's run-to-completion flow. The engine prepares audio (mono,
/// 16 kHz), delegates inference to [`WhisperModel`], and assembles the
/// result record.
pub struct TranscriptionEngine {
    /// Currently loaded Whisper model
    model: Option<WhisperModel>,

    /// Language hint applied to every pass
    language: Option<String>,

    /// Device for model inference (CPU/GPU)
    device: Device,
}

impl TranscriptionEngine {
    /// Create a new transcription engine.
    pub fn new(language: Option<String>, device: Device) -> Self {
        Self {
            model: None,
            language,
            device,
        }
    }

    /// Fetch and load the model this engine will run.
    ///
    /// Replaces any previously loaded model, freeing its memory.
    pub async fn load_model(&mut self, spec: &ModelSpec) -> AppResult<()> {
        let start_time = Instant::now();
        let model = WhisperModel::load(spec, self.device.clone()).await?;
        self.model = Some(model);
        info!(
            "Transcription engine ready in {:.2}s",
            start_time.elapsed().as_secs_f64()
        );
        Ok(())
    }

    /// Check if a model is currently loaded and ready.
    pub fn is_model_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Hub repo id of the loaded model, if any.
    pub fn model_name(&self) -> Option<&str> {
        self.model.as_ref().map(|m| m.repo_id())
    }

    /// Transcribe a decoded audio buffer.
    ///
    /// ## Process:
    /// 1. Validate the input and downmix/resample it for the model
    /// 2. Run the decode pass (with or without timestamp tokens)
    /// 3. Assemble the result with timing metadata; when timestamps
    ///    were requested, derive the word/char collections from the
    ///    segment records
    pub fn transcribe(
        &mut self,
        buffer: &AudioBuffer,
        with_timestamps: bool,
    ) -> AppResult<TranscriptionResult> {
        let samples = audio::prepare_for_model(buffer);
        if samples.is_empty() {
            return Err(AppError::Audio("Audio data is empty".to_string()));
        }

        let audio_duration_secs = samples.len() as f64 / audio::SAMPLE_RATE as f64;
        if audio_duration_secs < 1.0 {
            warn!(
                "Audio is only {:.2}s long, transcription may be inaccurate",
                audio_duration_secs
            );
        }

        let model = self
            .model
            .as_mut()
            .ok_or_else(|| AppError::Model("No model loaded for transcription".to_string()))?;

        let options = TranscribeOptions {
            language: self.language.clone(),
            timestamps: with_timestamps,
        };

        let start_time = Instant::now();
        let raw = model.transcribe(&samples, &options)?;
        let inference_time_secs = start_time.elapsed().as_secs_f64();

        let rtf = if audio_duration_secs > 0.0 {
            inference_time_secs / audio_duration_secs
        } else {
            0.0
        };

        info!(
            "Transcribed {:.2}s of audio in {:.2}s (RTF {:.3}, {} chars)",
            audio_duration_secs,
            inference_time_secs,
            rtf,
            raw.text.len()
        );

        let timestamps = if with_timestamps {
            Some(TimestampBundle::from_segments(raw.segments))
        } else {
            None
        };

        Ok(TranscriptionResult {
            text: raw.text,
            model_name: model.repo_id().to_string(),
            language: self.language.clone(),
            audio_duration_secs,
            inference_time_secs,
            rtf,
            timestamps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp_line() {
        let span = TimedSpan {
            start: 0.0,
            end: 2.5,
            text: "hello world".to_string(),
        };
        assert_eq!(format_timestamp_line(&span), "0.00s - 2.50s : hello world");
    }

    #[test]
    fn test_bundle_derivation_keeps_collections_parallel() {
        let segments = vec![
            TimedSpan {
                start: 0.0,
                end: 1.0,
                text: "ab cd".to_string(),
            },
            TimedSpan {
                start: 1.0,
                end: 2.0,
                text: "efg".to_string(),
            },
        ];
        let bundle = TimestampBundle::from_segments(segments);

        assert_eq!(bundle.segments.len(), 2);
        assert_eq!(bundle.words.len(), 3); // "ab", "cd", "efg"
        assert_eq!(bundle.chars.len(), 5 + 3); // "ab cd" + "efg"

        // Word records stay inside their segments, in order
        for word in &bundle.words {
            assert!(word.start >= bundle.segments[0].start - 1e-9);
            assert!(word.end <= bundle.segments[1].end + 1e-9);
        }
        for pair in bundle.segments.windows(2) {
            assert!(pair[0].start <= pair[1].start);
        }
    }

    #[test]
    fn test_transcribe_without_model_fails() {
        let mut engine = TranscriptionEngine::new(Some("en".to_string()), Device::Cpu);
        assert!(!engine.is_model_loaded());
        assert!(engine.model_name().is_none());

        let buffer = AudioBuffer::new(vec![0.0; 16_000], 16_000, 1);
        let result = engine.transcribe(&buffer, false);
        assert!(matches!(result, Err(AppError::Model(_))));
    }

    #[test]
    fn test_transcribe_empty_audio_fails() {
        let mut engine = TranscriptionEngine::new(None, Device::Cpu);
        let buffer = AudioBuffer::new(Vec::new(), 16_000, 1);
        let result = engine.transcribe(&buffer, false);
        assert!(matches!(result, Err(AppError::Audio(_))));
    }
}
