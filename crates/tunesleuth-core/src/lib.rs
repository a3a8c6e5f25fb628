//! tunesleuth core - song recognition from short audio samples
//!
//! Decodes an audio file, optionally cleans it with spectral subtraction,
//! computes a Chromaprint fingerprint and asks AcoustID for matching
//! recordings.

pub mod audio;
pub mod config;
pub mod denoise;
pub mod fingerprint;
pub mod lookup;
pub mod recognizer;
pub mod settings;
pub mod transform;

pub use config::{DenoiseConfig, RecognizerConfig};
pub use denoise::{DenoiseError, DenoiseOutcome, Denoiser, NoiseProfile};
pub use fingerprint::{Fingerprint, FingerprintError};
pub use lookup::{AcoustIdClient, LookupError, MatchLookup, RawMatch};
pub use recognizer::{
    clamp_max_results, select_candidates, MatchCandidate, Recognition, RecognitionStatus,
    Recognizer,
};
pub use settings::Settings;

/// Recognize a single file with the HTTP AcoustID lookup
pub fn recognize_file(
    audio_path: &str,
    api_key: &str,
    config: &RecognizerConfig,
    max_results: usize,
) -> anyhow::Result<Recognition> {
    config.validate()?;
    let recognizer = Recognizer::new(api_key, config.clone())?;
    Ok(recognizer.recognize(audio_path, max_results))
}
