//! # WAV Loading and PCM Preparation
//!
//! Reads WAV files into normalized f32 buffers and reshapes them for the
//! model: stereo is downmixed by channel averaging, integer PCM is scaled
//! into [-1.0, 1.0], and anything not recorded at 16 kHz is resampled by
//! linear interpolation. Container parsing itself is owned by the `wav`
//! crate; only the sample-format handling lives here.

use crate::audio::{AudioBuffer, SAMPLE_RATE};
use crate::error::{AppError, AppResult};
use std::fs::File;
use std::path::Path;

/// Load a WAV file and return a normalized audio buffer.
///
/// ## Supported sample formats:
/// - 8-bit unsigned, 16-bit and 24-bit signed PCM (scaled to [-1.0, 1.0])
/// - 32-bit IEEE float (taken as-is)
pub fn load_wav(path: impl AsRef<Path>) -> AppResult<AudioBuffer> {
    let path = path.as_ref();
    let mut file = File::open(path)
        .map_err(|e| AppError::Audio(format!("Cannot open {}: {}", path.display(), e)))?;

    let (header, data) = wav::read(&mut file)
        .map_err(|e| AppError::Audio(format!("Cannot parse {}: {}", path.display(), e)))?;

    let samples: Vec<f32> = match data {
        wav::BitDepth::Eight(values) => values
            .into_iter()
            .map(|s| (s as f32 - 128.0) / 128.0)
            .collect(),
        wav::BitDepth::Sixteen(values) => {
            values.into_iter().map(|s| s as f32 / 32_768.0).collect()
        }
        wav::BitDepth::TwentyFour(values) => values
            .into_iter()
            .map(|s| s as f32 / 8_388_608.0)
            .collect(),
        wav::BitDepth::ThirtyTwoFloat(values) => values,
        wav::BitDepth::Empty => {
            return Err(AppError::Audio(format!(
                "{} contains no audio data",
                path.display()
            )))
        }
    };

    if samples.is_empty() {
        return Err(AppError::Audio(format!(
            "{} contains no audio data",
            path.display()
        )));
    }

    Ok(AudioBuffer::new(
        samples,
        header.sampling_rate as usize,
        header.channel_count as usize,
    ))
}

/// Convert multi-channel audio to mono by averaging channels.
pub fn to_mono(buffer: &AudioBuffer) -> AudioBuffer {
    if buffer.channels <= 1 {
        return buffer.clone();
    }

    let mono_samples: Vec<f32> = buffer
        .samples
        .chunks(buffer.channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    AudioBuffer::new(mono_samples, buffer.sample_rate, 1)
}

/// Linear interpolation resampling.
pub fn resample(samples: &[f32], from_rate: usize, to_rate: usize) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let out_len = (samples.len() as f64 * ratio).ceil() as usize;

    (0..out_len)
        .map(|i| {
            let src = i as f64 / ratio;
            let i0 = src.floor() as usize;
            let i1 = (i0 + 1).min(samples.len() - 1);
            let frac = (src - i0 as f64) as f32;
            samples[i0] * (1.0 - frac) + samples[i1] * frac
        })
        .collect()
}

/// Reshape a decoded buffer into what the model consumes: mono, 16 kHz.
pub fn prepare_for_model(buffer: &AudioBuffer) -> Vec<f32> {
    let mono = to_mono(buffer);
    resample(&mono.samples, mono.sample_rate, SAMPLE_RATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_mono_averages_channels() {
        // Stereo frames: (1.0, 0.0), (0.5, 0.5)
        let stereo = AudioBuffer::new(vec![1.0, 0.0, 0.5, 0.5], 16_000, 2);
        let mono = to_mono(&stereo);

        assert_eq!(mono.channels, 1);
        assert_eq!(mono.samples.len(), 2);
        assert!((mono.samples[0] - 0.5).abs() < 1e-6);
        assert!((mono.samples[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_resample_changes_length_by_rate_ratio() {
        let samples = vec![0.0f32; 32_000];
        let down = resample(&samples, 32_000, 16_000);
        assert_eq!(down.len(), 16_000);

        let up = resample(&samples, 16_000, 32_000);
        assert_eq!(up.len(), 64_000);

        // Same rate is a passthrough
        let same = resample(&samples, 16_000, 16_000);
        assert_eq!(same.len(), samples.len());
    }

    #[test]
    fn test_resample_interpolates_between_samples() {
        // Doubling the rate of a ramp should keep it a ramp
        let ramp = vec![0.0, 1.0];
        let up = resample(&ramp, 8_000, 16_000);
        assert_eq!(up.len(), 4);
        assert!((up[0] - 0.0).abs() < 1e-6);
        assert!((up[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_load_wav_normalizes_i16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");

        let header = wav::Header::new(wav::WAV_FORMAT_PCM, 1, 16_000, 16);
        let data = wav::BitDepth::Sixteen(vec![0, 16_384, -16_384, 32_767]);
        let mut out = File::create(&path).unwrap();
        wav::write(header, &data, &mut out).unwrap();

        let buffer = load_wav(&path).unwrap();
        assert_eq!(buffer.sample_rate, 16_000);
        assert_eq!(buffer.channels, 1);
        assert_eq!(buffer.samples.len(), 4);
        assert!((buffer.samples[0]).abs() < 1e-6);
        assert!((buffer.samples[1] - 0.5).abs() < 1e-3);
        assert!((buffer.samples[2] + 0.5).abs() < 1e-3);
        assert!(buffer.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_load_wav_missing_file() {
        let result = load_wav("definitely/not/here.wav");
        assert!(result.is_err());
    }
}
