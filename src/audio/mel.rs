//! # Mel Filterbank Generation
//!
//! Whisper's feature extractor multiplies the power spectrogram by a
//! Slaney-normalized mel filterbank (the librosa default). The reference
//! checkpoints ship the bank as a binary sidecar; here it is generated
//! programmatically for the checkpoint's `num_mel_bins`, laid out
//! row-major `[n_mels, n_fft/2 + 1]` as
//! `candle_transformers::models::whisper::audio::pcm_to_mel` expects.

use candle_transformers::models::whisper as m;

/// Slaney mel scale: linear below 1000 Hz, logarithmic above.
const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;
const LOG_STEP: f64 = 0.06875177742094912; // ln(6.4) / 27

fn hz_to_mel(hz: f64) -> f64 {
    if hz < MIN_LOG_HZ {
        hz / F_SP
    } else {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / LOG_STEP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    if mel < MIN_LOG_MEL {
        mel * F_SP
    } else {
        MIN_LOG_HZ * ((mel - MIN_LOG_MEL) * LOG_STEP).exp()
    }
}

/// Generate the Slaney mel filterbank for a Whisper checkpoint.
///
/// Returns `n_mels * (n_fft/2 + 1)` weights, row-major, covering
/// 0 Hz to Nyquist at the model's 16 kHz input rate.
pub fn whisper_filters(n_mels: usize) -> Vec<f32> {
    mel_filterbank(n_mels, m::N_FFT, super::SAMPLE_RATE)
}

/// Slaney-normalized triangular mel filterbank, flattened row-major.
pub fn mel_filterbank(n_mels: usize, n_fft: usize, sample_rate: usize) -> Vec<f32> {
    let n_freqs = n_fft / 2 + 1;
    let mut bank = vec![0.0f32; n_mels * n_freqs];

    let mel_min = hz_to_mel(0.0);
    let mel_max = hz_to_mel(sample_rate as f64 / 2.0);

    // Edge frequencies of the triangular filters: n_mels + 2 points
    // evenly spaced on the mel scale, mapped back to Hz.
    let hz_points: Vec<f64> = (0..=n_mels + 1)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
        .collect();

    let fft_freqs: Vec<f64> = (0..n_freqs)
        .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
        .collect();

    for row in 0..n_mels {
        let f_left = hz_points[row];
        let f_center = hz_points[row + 1];
        let f_right = hz_points[row + 2];

        // Slaney normalization keeps equal area per filter.
        let enorm = 2.0 / (f_right - f_left);

        for (k, &freq) in fft_freqs.iter().enumerate() {
            let rising = (freq - f_left) / (f_center - f_left);
            let falling = (f_right - freq) / (f_right - f_center);
            let weight = rising.min(falling).max(0.0);
            bank[row * n_freqs + k] = (weight * enorm) as f32;
        }
    }

    bank
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mel_scale_round_trip() {
        for &hz in &[100.0, 440.0, 1000.0, 4000.0, 7600.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!((hz - back).abs() < 1e-6, "round trip failed for {} Hz", hz);
        }
    }

    #[test]
    fn test_filterbank_shape() {
        let bank = mel_filterbank(80, 400, 16_000);
        assert_eq!(bank.len(), 80 * 201); // n_mels * (n_fft/2 + 1)

        let bank128 = mel_filterbank(128, 400, 16_000);
        assert_eq!(bank128.len(), 128 * 201);
    }

    #[test]
    fn test_filterbank_rows_nonnegative_and_nonempty() {
        let n_mels = 80;
        let n_freqs = 201;
        let bank = mel_filterbank(n_mels, 400, 16_000);

        for row in 0..n_mels {
            let filter = &bank[row * n_freqs..(row + 1) * n_freqs];
            assert!(filter.iter().all(|&w| w >= 0.0));
            let area: f32 = filter.iter().sum();
            assert!(area > 0.0, "filter row {} is empty", row);
        }
    }
}
