//! Recognition pipeline and result selection
//!
//! Ties the optional denoiser to a [`MatchLookup`] and turns raw lookup
//! tuples into a bounded, filtered list of candidates.

use crate::config::RecognizerConfig;
use crate::denoise::{DenoiseOutcome, Denoiser};
use crate::lookup::{AcoustIdClient, LookupError, MatchLookup, RawMatch};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[cfg(test)]
mod tests;

/// Default number of candidates reported
pub const DEFAULT_MAX_RESULTS: usize = 3;

/// Upper bound accepted for a requested candidate count
pub const MAX_RESULTS_LIMIT: usize = 10;

/// One identified recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// Lookup confidence in [0, 1]
    pub score: f64,
    /// MusicBrainz recording id
    pub recording_id: String,
    pub title: String,
    /// Credited artists, empty when unknown
    pub artist: String,
}

/// Outcome class of one recognition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecognitionStatus {
    Matched,
    NoMatch,
    NotFound,
    AuthenticationFailed { message: String },
    LookupFailed { message: String },
}

/// Result of recognizing one audio file
#[derive(Debug, Clone, Serialize)]
pub struct Recognition {
    /// Path of the query file
    pub query_path: String,
    #[serde(flatten)]
    pub status: RecognitionStatus,
    /// Whether the lookup ran on denoised audio
    pub denoised: bool,
    pub candidates: Vec<MatchCandidate>,
}

impl Recognition {
    fn empty(query_path: String, status: RecognitionStatus, denoised: bool) -> Self {
        Self {
            query_path,
            status,
            denoised,
            candidates: Vec::new(),
        }
    }

    pub fn is_match(&self) -> bool {
        self.status == RecognitionStatus::Matched
    }

    /// True for outcomes caused by a failure rather than by the audio
    pub fn is_error(&self) -> bool {
        matches!(
            self.status,
            RecognitionStatus::NotFound
                | RecognitionStatus::AuthenticationFailed { .. }
                | RecognitionStatus::LookupFailed { .. }
        )
    }
}

/// Clamp a requested candidate count to `1..=MAX_RESULTS_LIMIT`
pub fn clamp_max_results(requested: i64) -> usize {
    requested.clamp(1, MAX_RESULTS_LIMIT as i64) as usize
}

/// Keep the first `max_results` raw matches that have a recording id and a title
///
/// Lookup order is preserved, nothing is re-ranked.
pub fn select_candidates<I>(raw: I, max_results: usize) -> Vec<MatchCandidate>
where
    I: IntoIterator<Item = RawMatch>,
{
    raw.into_iter()
        .filter_map(|m| {
            let title = m.title.filter(|t| !t.is_empty())?;
            if m.recording_id.is_empty() {
                return None;
            }
            Some(MatchCandidate {
                score: m.score,
                recording_id: m.recording_id,
                title,
                artist: m.artist.unwrap_or_default(),
            })
        })
        .take(max_results)
        .collect()
}

/// Song recognizer over a fingerprint lookup
pub struct Recognizer<L: MatchLookup = AcoustIdClient> {
    api_key: String,
    config: RecognizerConfig,
    denoiser: Denoiser,
    lookup: L,
}

impl Recognizer<AcoustIdClient> {
    /// Recognizer backed by the AcoustID web service
    pub fn new(api_key: impl Into<String>, config: RecognizerConfig) -> Result<Self, LookupError> {
        let lookup = AcoustIdClient::new(&config)?;
        Ok(Self::with_lookup(api_key, config, lookup))
    }
}

impl<L: MatchLookup> Recognizer<L> {
    pub fn with_lookup(api_key: impl Into<String>, config: RecognizerConfig, lookup: L) -> Self {
        let denoiser = Denoiser::new(config.denoise_params.clone());
        Self {
            api_key: api_key.into(),
            config,
            denoiser,
            lookup,
        }
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    /// Identify the song in an audio file
    ///
    /// Never fails: missing files, lookup errors and empty results are all
    /// reported through [`Recognition::status`].
    pub fn recognize(&self, audio_path: impl AsRef<Path>, max_results: usize) -> Recognition {
        let path = audio_path.as_ref();
        let query_path = path.display().to_string();

        if !path.is_file() {
            log::warn!("Audio file not found: {}", query_path);
            return Recognition::empty(query_path, RecognitionStatus::NotFound, false);
        }

        // The scratch file must outlive the lookup
        let outcome = self
            .config
            .denoise
            .then(|| self.denoiser.denoise_file(path));
        let denoised = outcome.as_ref().is_some_and(DenoiseOutcome::is_cleaned);
        let input = outcome
            .as_ref()
            .map(|o| o.path_or(path))
            .unwrap_or(path);

        log::info!("Looking up {}", input.display());

        let raw = match self.lookup.lookup(input, &self.api_key) {
            Ok(raw) => raw,
            Err(e) => {
                log::error!("Lookup failed for {}: {}", query_path, e);
                let status = if e.is_authentication() {
                    RecognitionStatus::AuthenticationFailed {
                        message: e.to_string(),
                    }
                } else {
                    RecognitionStatus::LookupFailed {
                        message: e.to_string(),
                    }
                };
                return Recognition::empty(query_path, status, denoised);
            }
        };

        let raw_count = raw.len();
        let candidates = select_candidates(raw, max_results);
        log::info!(
            "{}: {} raw match(es), {} candidate(s) kept",
            query_path,
            raw_count,
            candidates.len()
        );

        let status = if candidates.is_empty() {
            RecognitionStatus::NoMatch
        } else {
            RecognitionStatus::Matched
        };

        Recognition {
            query_path,
            status,
            denoised,
            candidates,
        }
    }

    /// Recognize several files in parallel, results in input order
    pub fn recognize_batch<P>(&self, paths: &[P], max_results: usize) -> Vec<Recognition>
    where
        P: AsRef<Path> + Sync,
    {
        paths
            .par_iter()
            .map(|path| self.recognize(path, max_results))
            .collect()
    }
}
