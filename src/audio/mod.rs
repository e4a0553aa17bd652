//! # Audio Processing Module
//!
//! Handles audio file loading and preprocessing for the transcription
//! pipeline. The Whisper checkpoints consume 16 kHz mono f32 PCM in
//! [-1.0, 1.0]; everything read from disk is normalized to that shape
//! before feature extraction.
//!
//! ## Key Components:
//! - **Loader**: WAV decoding, sample normalization, downmix, resampling
//! - **Mel**: Slaney mel filterbank generation for feature extraction

pub mod loader;      // WAV decoding and PCM preparation
pub mod mel;         // Mel filterbank generation

pub use loader::{load_wav, prepare_for_model, resample, to_mono};

/// Sample rate every Whisper checkpoint expects.
pub const SAMPLE_RATE: usize = 16_000;

/// Buffer of decoded audio.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Audio samples, interleaved when multi-channel, normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: usize,

    /// Number of channels
    pub channels: usize,
}

impl AudioBuffer {
    /// Create a new audio buffer.
    pub fn new(samples: Vec<f32>, sample_rate: usize, channels: usize) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate * self.channels) as f64
    }

    /// Number of samples per channel.
    pub fn num_samples(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_duration() {
        let buffer = AudioBuffer::new(vec![0.0; 32_000], 16_000, 1);
        assert!((buffer.duration() - 2.0).abs() < 1e-9);

        let stereo = AudioBuffer::new(vec![0.0; 32_000], 16_000, 2);
        assert!((stereo.duration() - 1.0).abs() < 1e-9);
        assert_eq!(stereo.num_samples(), 16_000);
    }
}
