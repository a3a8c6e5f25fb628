//! Spectral-subtraction noise reduction
//!
//! Hummed, sung or phone-recorded queries carry a lot of stationary noise
//! (hiss, hum, room tone) that hurts fingerprint matching. The denoiser
//! estimates a per-bin noise floor from a low percentile of the magnitude
//! spectrum and subtracts part of it, keeping a fixed share of the original
//! magnitude in every bin so no bin is ever zeroed out. Phase is left as is.
//!
//! Denoising is best effort: [`Denoiser::denoise_file`] reports failures as a
//! [`DenoiseOutcome::Fallback`] and the caller keeps using the original audio.

use crate::audio::{decode_audio, resample_to_target, ScratchWav};
use crate::config::DenoiseConfig;
use crate::transform::{self, Spectrogram};
use std::path::Path;
use thiserror::Error;

/// Denoising errors
#[derive(Debug, Error)]
pub enum DenoiseError {
    #[error("Invalid denoise configuration: {0}")]
    Config(String),

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("No audio samples to denoise")]
    EmptyInput,

    #[error("Non-finite sample at index {0}")]
    NonFiniteSample(usize),

    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("Spectral transform failed: {0}")]
    Transform(String),

    #[error("Failed to write cleaned audio: {0}")]
    Encode(String),
}

/// Estimated stationary noise level per frequency bin
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseProfile {
    pub floor: Vec<f32>,
}

impl NoiseProfile {
    /// Take the given percentile of each bin's magnitude across all frames
    pub fn estimate(magnitudes: &[Vec<f32>], percentile_rank: f32) -> Self {
        let num_bins = magnitudes.first().map(|frame| frame.len()).unwrap_or(0);
        let mut column = Vec::with_capacity(magnitudes.len());

        let floor = (0..num_bins)
            .map(|bin| {
                column.clear();
                column.extend(magnitudes.iter().filter_map(|frame| frame.get(bin).copied()));
                percentile(&mut column, percentile_rank)
            })
            .collect();

        Self { floor }
    }

    pub fn num_bins(&self) -> usize {
        self.floor.len()
    }
}

/// Result of best-effort file denoising
#[derive(Debug)]
pub enum DenoiseOutcome {
    /// Cleaned audio, removed from disk when dropped
    Cleaned(ScratchWav),
    /// Denoising failed; the original audio should be used
    Fallback { reason: DenoiseError },
}

impl DenoiseOutcome {
    pub fn is_cleaned(&self) -> bool {
        matches!(self, DenoiseOutcome::Cleaned(_))
    }

    /// Path to feed downstream: the cleaned file, or `original` on fallback
    pub fn path_or<'a>(&'a self, original: &'a Path) -> &'a Path {
        match self {
            DenoiseOutcome::Cleaned(scratch) => scratch.path(),
            DenoiseOutcome::Fallback { .. } => original,
        }
    }
}

/// Spectral-subtraction denoiser
#[derive(Debug, Clone)]
pub struct Denoiser {
    config: DenoiseConfig,
}

impl Denoiser {
    pub fn new(config: DenoiseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DenoiseConfig {
        &self.config
    }

    /// Clean a mono waveform
    ///
    /// Input at any other rate is resampled to the configured rate first; the
    /// returned samples are at the configured rate and clipped to [-1, 1].
    pub fn denoise(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<f32>, DenoiseError> {
        self.config
            .validate()
            .map_err(|e| DenoiseError::Config(e.to_string()))?;

        if samples.is_empty() {
            return Err(DenoiseError::EmptyInput);
        }
        if let Some(idx) = samples.iter().position(|s| !s.is_finite()) {
            return Err(DenoiseError::NonFiniteSample(idx));
        }

        let samples = resample_to_target(samples, sample_rate, self.config.sample_rate)
            .map_err(|e| DenoiseError::Resample(format!("{:#}", e)))?;
        if samples.is_empty() {
            return Err(DenoiseError::EmptyInput);
        }

        let mut spectrogram = transform::stft(&samples, self.config.fft_size, self.config.hop_size)
            .map_err(|e| DenoiseError::Transform(format!("{:#}", e)))?;

        let mut magnitudes = spectrogram.magnitudes();
        let phases = spectrogram.phases();

        let profile = NoiseProfile::estimate(&magnitudes, self.config.noise_percentile);
        self.subtract(&mut magnitudes, &profile);

        spectrogram
            .set_polar(&magnitudes, &phases)
            .map_err(|e| DenoiseError::Transform(format!("{:#}", e)))?;

        let mut cleaned = transform::istft(&spectrogram)
            .map_err(|e| DenoiseError::Transform(format!("{:#}", e)))?;

        for sample in cleaned.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }

        log::debug!(
            "Denoised {} samples ({} frames x {} bins)",
            cleaned.len(),
            spectrogram.num_frames,
            spectrogram.num_bins
        );

        Ok(cleaned)
    }

    /// Noise floor of a spectrogram using the configured percentile
    pub fn noise_profile(&self, spectrogram: &Spectrogram) -> NoiseProfile {
        NoiseProfile::estimate(&spectrogram.magnitudes(), self.config.noise_percentile)
    }

    /// Subtract the scaled noise floor, never going below the magnitude floor
    pub fn subtract(&self, magnitudes: &mut [Vec<f32>], profile: &NoiseProfile) {
        let factor = self.config.subtraction_factor;
        let keep = self.config.magnitude_floor;

        for frame in magnitudes.iter_mut() {
            for (mag, &noise) in frame.iter_mut().zip(&profile.floor) {
                let original = *mag;
                *mag = (original - factor * noise).max(keep * original);
            }
        }
    }

    /// Decode, clean and write a file to a scratch WAV
    ///
    /// Never fails: any error is returned as [`DenoiseOutcome::Fallback`].
    pub fn denoise_file(&self, path: &Path) -> DenoiseOutcome {
        match self.try_denoise_file(path) {
            Ok(scratch) => {
                log::info!(
                    "Audio preprocessed: {} -> {}",
                    path.display(),
                    scratch.path().display()
                );
                DenoiseOutcome::Cleaned(scratch)
            }
            Err(reason) => {
                log::warn!(
                    "Audio preprocessing failed for {}: {}. Using original file",
                    path.display(),
                    reason
                );
                DenoiseOutcome::Fallback { reason }
            }
        }
    }

    fn try_denoise_file(&self, path: &Path) -> Result<ScratchWav, DenoiseError> {
        let audio = decode_audio(path, self.config.sample_rate)
            .map_err(|e| DenoiseError::Decode(format!("{:#}", e)))?;

        let cleaned = self.denoise(&audio.samples, audio.sample_rate)?;

        ScratchWav::write_pcm16(&cleaned, self.config.sample_rate)
            .map_err(|e| DenoiseError::Encode(format!("{:#}", e)))
    }
}

impl Default for Denoiser {
    fn default() -> Self {
        Self::new(DenoiseConfig::default())
    }
}

/// Percentile with linear interpolation between closest ranks
///
/// Sorts `values` in place. Returns 0.0 for an empty slice.
pub fn percentile(values: &mut [f32], rank: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let position = (rank.clamp(0.0, 100.0) / 100.0) * (values.len() - 1) as f32;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let frac = position - lower as f32;

    values[lower] + (values[upper] - values[lower]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::PI;

    fn tone(freq: f32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / 22050.0).sin())
            .collect()
    }

    // Deterministic LCG noise in [-amplitude, amplitude]
    fn noise(len: usize, amplitude: f32) -> Vec<f32> {
        let mut state: u32 = 0x1234_5678;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                ((state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0) * amplitude
            })
            .collect()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    fn assert_floor_holds(samples: &[f32]) {
        let denoiser = Denoiser::default();
        let spectrogram = transform::stft(samples, 2048, 512).unwrap();
        let original = spectrogram.magnitudes();
        let profile = denoiser.noise_profile(&spectrogram);

        let mut cleaned = original.clone();
        denoiser.subtract(&mut cleaned, &profile);

        for (orig_frame, clean_frame) in original.iter().zip(&cleaned) {
            for (&orig, &clean) in orig_frame.iter().zip(clean_frame) {
                assert!(clean >= 0.1 * orig, "{} < 0.1 * {}", clean, orig);
                assert!(clean <= orig);
            }
        }
    }

    #[test]
    fn test_percentile_interpolates() {
        let mut values = vec![5.0, 1.0, 4.0, 2.0, 3.0];
        assert_abs_diff_eq!(percentile(&mut values, 0.0), 1.0);
        assert_abs_diff_eq!(percentile(&mut values, 50.0), 3.0);
        assert_abs_diff_eq!(percentile(&mut values, 100.0), 5.0);
        assert_abs_diff_eq!(percentile(&mut values, 20.0), 1.8, epsilon = 1e-6);
    }

    #[test]
    fn test_percentile_edge_cases() {
        assert_eq!(percentile(&mut [], 20.0), 0.0);
        assert_eq!(percentile(&mut [7.0], 20.0), 7.0);
    }

    #[test]
    fn test_noise_profile_per_bin() {
        let magnitudes = vec![
            vec![1.0, 10.0],
            vec![2.0, 20.0],
            vec![3.0, 30.0],
            vec![4.0, 40.0],
            vec![5.0, 50.0],
            vec![6.0, 60.0],
        ];
        let profile = NoiseProfile::estimate(&magnitudes, 20.0);
        assert_eq!(profile.num_bins(), 2);
        assert_abs_diff_eq!(profile.floor[0], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(profile.floor[1], 20.0, epsilon = 1e-5);
    }

    #[test]
    fn test_subtract_formula() {
        let denoiser = Denoiser::default();
        let profile = NoiseProfile {
            floor: vec![1.0, 10.0, 0.0],
        };
        let mut magnitudes = vec![vec![2.0, 2.0, 0.5]];
        denoiser.subtract(&mut magnitudes, &profile);

        // 2 - 0.3 * 1 = 1.7
        assert_abs_diff_eq!(magnitudes[0][0], 1.7, epsilon = 1e-6);
        // 2 - 3 < 0.2 -> floor
        assert_abs_diff_eq!(magnitudes[0][1], 0.2, epsilon = 1e-6);
        // nothing to subtract
        assert_abs_diff_eq!(magnitudes[0][2], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_floor_holds_for_silence() {
        assert_floor_holds(&vec![0.0; 22050]);
    }

    #[test]
    fn test_floor_holds_for_pure_tone() {
        assert_floor_holds(&tone(440.0, 22050, 0.8));
    }

    #[test]
    fn test_floor_holds_for_noisy_tone() {
        let signal: Vec<f32> = tone(660.0, 22050, 0.5)
            .iter()
            .zip(noise(22050, 0.2))
            .map(|(t, n)| t + n)
            .collect();
        assert_floor_holds(&signal);
    }

    #[test]
    fn test_denoise_keeps_length_and_range() {
        let signal: Vec<f32> = tone(440.0, 30_000, 0.9)
            .iter()
            .zip(noise(30_000, 0.3))
            .map(|(t, n)| t + n)
            .collect();
        let cleaned = Denoiser::default().denoise(&signal, 22050).unwrap();

        assert_eq!(cleaned.len(), signal.len());
        assert!(cleaned.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_denoise_reduces_stationary_noise() {
        let hiss = noise(44_100, 0.1);
        let cleaned = Denoiser::default().denoise(&hiss, 22050).unwrap();
        assert!(rms(&cleaned) < rms(&hiss));
        // at least 10% of the energy survives in every bin
        assert!(rms(&cleaned) > 0.05 * rms(&hiss));
    }

    #[test]
    fn test_denoise_silence_stays_silent() {
        let cleaned = Denoiser::default().denoise(&vec![0.0; 8192], 22050).unwrap();
        assert!(cleaned.iter().all(|&s| s.abs() < 1e-6));
    }

    #[test]
    fn test_denoise_resamples_other_rates() {
        let signal = noise(44_100, 0.2);
        let cleaned = Denoiser::default().denoise(&signal, 44_100).unwrap();
        assert_eq!(cleaned.len(), 22_050);
    }

    #[test]
    fn test_denoise_single_sample() {
        let cleaned = Denoiser::default().denoise(&[0.25], 22050).unwrap();
        assert_eq!(cleaned.len(), 1);
    }

    #[test]
    fn test_denoise_rejects_empty_input() {
        let result = Denoiser::default().denoise(&[], 22050);
        assert!(matches!(result, Err(DenoiseError::EmptyInput)));
    }

    #[test]
    fn test_denoise_rejects_non_finite() {
        let mut signal = vec![0.0; 4096];
        signal[17] = f32::NAN;
        let result = Denoiser::default().denoise(&signal, 22050);
        assert!(matches!(result, Err(DenoiseError::NonFiniteSample(17))));
    }

    #[test]
    fn test_denoise_rejects_invalid_config() {
        let denoiser = Denoiser::new(DenoiseConfig {
            hop_size: 0,
            ..DenoiseConfig::default()
        });
        let result = denoiser.denoise(&[0.0; 4096], 22050);
        assert!(matches!(result, Err(DenoiseError::Config(_))));
    }

    #[test]
    fn test_denoise_file_missing_falls_back() {
        let original = Path::new("/no/such/recording.wav");
        let outcome = Denoiser::default().denoise_file(original);

        assert!(!outcome.is_cleaned());
        assert!(matches!(
            outcome,
            DenoiseOutcome::Fallback {
                reason: DenoiseError::Decode(_)
            }
        ));
        assert_eq!(outcome.path_or(original), original);
    }

    #[test]
    fn test_denoise_file_corrupt_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.wav");
        std::fs::write(&path, [0u8; 3]).unwrap();

        let outcome = Denoiser::default().denoise_file(&path);
        assert!(!outcome.is_cleaned());
        assert_eq!(outcome.path_or(&path), path.as_path());
    }

    #[test]
    fn test_denoise_file_writes_pcm16_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in tone(440.0, 44_100, 0.5) {
            let v = (s * 32767.0) as i16;
            writer.write_sample(v).unwrap();
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();

        let outcome = Denoiser::default().denoise_file(&path);
        let scratch_path = match &outcome {
            DenoiseOutcome::Cleaned(scratch) => scratch.path().to_path_buf(),
            DenoiseOutcome::Fallback { reason } => panic!("unexpected fallback: {}", reason),
        };
        assert_eq!(outcome.path_or(&path), scratch_path.as_path());

        let reader = hound::WavReader::open(&scratch_path).unwrap();
        let out_spec = reader.spec();
        assert_eq!(out_spec.channels, 1);
        assert_eq!(out_spec.sample_rate, 22_050);
        assert_eq!(out_spec.bits_per_sample, 16);
        assert_eq!(reader.duration(), 44_100 / 2);

        drop(outcome);
        assert!(!scratch_path.exists());
    }
}
