//! Chromaprint fingerprints in the format the AcoustID service expects
//!
//! Audio is decoded to mono at the pipeline rate, quantized to 16-bit PCM and
//! fed to Chromaprint. The compressed fingerprint is base64 encoded with the
//! URL-safe alphabet and no padding, the same string `fpcalc` prints.

use crate::audio::{decode_audio, quantize_pcm16};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rusty_chromaprint::{Configuration, FingerprintCompressor, Fingerprinter};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// Fingerprinting errors
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Audio too short to fingerprint")]
    AudioTooShort,

    #[error("Chromaprint error: {0}")]
    Chromaprint(String),
}

/// Encoded fingerprint plus the track duration sent alongside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fingerprint {
    pub encoded: String,
    pub duration_secs: u32,
}

/// Computes AcoustID-compatible fingerprints
#[derive(Debug, Clone)]
pub struct FingerprintCalculator {
    sample_rate: u32,
    /// Only the first N seconds are fingerprinted
    max_seconds: u32,
}

impl FingerprintCalculator {
    pub fn new(sample_rate: u32, max_seconds: u32) -> Self {
        Self {
            sample_rate,
            max_seconds,
        }
    }

    /// Decode and fingerprint an audio file
    pub fn fingerprint_file(&self, path: &Path) -> Result<Fingerprint, FingerprintError> {
        let audio = decode_audio(path, self.sample_rate)
            .map_err(|e| FingerprintError::Decode(format!("{:#}", e)))?;

        self.fingerprint_samples(&audio.samples, audio.sample_rate)
    }

    /// Fingerprint mono samples
    ///
    /// The duration reported is that of the whole input, even when only a
    /// prefix is fingerprinted.
    pub fn fingerprint_samples(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<Fingerprint, FingerprintError> {
        if samples.is_empty() || sample_rate == 0 {
            return Err(FingerprintError::AudioTooShort);
        }

        let max_samples = sample_rate as usize * self.max_seconds as usize;
        let pcm: Vec<i16> = samples
            .iter()
            .take(max_samples)
            .map(|&s| quantize_pcm16(s))
            .collect();

        let config = Configuration::preset_test2();
        let mut printer = Fingerprinter::new(&config);
        printer
            .start(sample_rate, 1)
            .map_err(|e| FingerprintError::Chromaprint(format!("{:?}", e)))?;
        printer.consume(&pcm);
        printer.finish();

        let raw = printer.fingerprint();
        if raw.is_empty() {
            return Err(FingerprintError::AudioTooShort);
        }

        let compressed = FingerprintCompressor::from(&config).compress(raw);
        let encoded = URL_SAFE_NO_PAD.encode(compressed);
        let duration_secs = (samples.len() as u64 / sample_rate as u64) as u32;

        log::debug!(
            "Fingerprinted {:.1}s of audio ({} raw items, {} chars)",
            pcm.len() as f64 / sample_rate as f64,
            raw.len(),
            encoded.len()
        );

        Ok(Fingerprint {
            encoded,
            duration_secs,
        })
    }
}

impl Default for FingerprintCalculator {
    fn default() -> Self {
        Self::new(crate::config::TARGET_SAMPLE_RATE, 120)
    }
}
