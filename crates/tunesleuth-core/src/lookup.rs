//! AcoustID fingerprint lookup
//!
//! [`MatchLookup`] is the seam between the recognizer and the outside world:
//! given an audio file and an API key it yields raw
//! `(score, recording id, title, artist)` tuples. [`AcoustIdClient`] is the
//! production implementation, fingerprinting the file locally and querying
//! the AcoustID v2 `lookup` endpoint.

use crate::config::RecognizerConfig;
use crate::fingerprint::{Fingerprint, FingerprintCalculator, FingerprintError};
use serde::Deserialize;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;

const USER_AGENT: &str = concat!("tunesleuth/", env!("CARGO_PKG_VERSION"));

/// AcoustID error code for an unknown application key
const ERROR_INVALID_API_KEY: i64 = 4;

/// Lookup errors
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Invalid API key: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
}

impl LookupError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, LookupError::Authentication(_))
    }
}

/// One raw match as returned by the lookup service
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatch {
    pub score: f64,
    pub recording_id: String,
    pub title: Option<String>,
    pub artist: Option<String>,
}

impl RawMatch {
    pub fn new(score: f64, recording_id: &str, title: &str, artist: &str) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            score,
            recording_id: recording_id.to_string(),
            title: non_empty(title),
            artist: non_empty(artist),
        }
    }
}

/// Fingerprint-and-lookup capability
pub trait MatchLookup: Send + Sync {
    /// Identify the audio at `audio_path`, authenticating with `api_key`
    fn lookup(&self, audio_path: &Path, api_key: &str) -> Result<Vec<RawMatch>, LookupError>;
}

/// AcoustID lookup response
#[derive(Debug, Deserialize)]
struct LookupResponse {
    status: String,
    results: Option<Vec<LookupResult>>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    score: f64,
    recordings: Option<Vec<Recording>>,
}

#[derive(Debug, Deserialize)]
struct Recording {
    id: String,
    title: Option<String>,
    artists: Option<Vec<Artist>>,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
    joinphrase: Option<String>,
}

/// Parse a lookup response body into raw matches, in response order
pub fn parse_lookup_response(body: &str) -> Result<Vec<RawMatch>, LookupError> {
    let response: LookupResponse = serde_json::from_str(body)
        .map_err(|e| LookupError::MalformedResponse(e.to_string()))?;

    if response.status != "ok" {
        let (code, message) = response
            .error
            .map(|e| (e.code, e.message))
            .unwrap_or((None, format!("status: {}", response.status)));

        if code == Some(ERROR_INVALID_API_KEY) || message.to_lowercase().contains("api key") {
            return Err(LookupError::Authentication(message));
        }
        return Err(LookupError::Api(code.unwrap_or(0) as u16, message));
    }

    let results = response
        .results
        .ok_or_else(|| LookupError::MalformedResponse("results not included".to_string()))?;

    let mut matches = Vec::new();
    for result in results {
        // A result without recordings cannot be named
        let Some(recordings) = result.recordings else {
            continue;
        };

        for recording in recordings {
            matches.push(RawMatch {
                score: result.score,
                recording_id: recording.id,
                title: recording.title,
                artist: recording.artists.as_deref().and_then(join_artists),
            });
        }
    }

    Ok(matches)
}

/// Join credited artists with their join phrases ("A feat. B")
fn join_artists(artists: &[Artist]) -> Option<String> {
    if artists.is_empty() {
        return None;
    }

    let mut joined = String::new();
    for (i, artist) in artists.iter().enumerate() {
        joined.push_str(&artist.name);
        match &artist.joinphrase {
            Some(phrase) => joined.push_str(phrase),
            None if i + 1 < artists.len() => joined.push_str(", "),
            None => {}
        }
    }
    Some(joined)
}

/// Spaces requests to respect the service rate limit
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    fn wait(&self) {
        let mut last = match self.last_request.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                log::debug!("AcoustID rate limiting: waiting {:?}", wait_time);
                std::thread::sleep(wait_time);
            }
        }

        *last = Some(Instant::now());
    }
}

/// AcoustID web service client
pub struct AcoustIdClient {
    http_client: reqwest::blocking::Client,
    rate_limiter: RateLimiter,
    fingerprinter: FingerprintCalculator,
    lookup_url: String,
}

impl AcoustIdClient {
    pub fn new(config: &RecognizerConfig) -> Result<Self, LookupError> {
        let http_client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(config.rate_limit_ms),
            fingerprinter: FingerprintCalculator::new(
                config.sample_rate,
                config.fingerprint_seconds,
            ),
            lookup_url: config.lookup_url.clone(),
        })
    }

    /// Query AcoustID for recordings matching an already computed fingerprint
    pub fn lookup_fingerprint(
        &self,
        fingerprint: &Fingerprint,
        api_key: &str,
    ) -> Result<Vec<RawMatch>, LookupError> {
        self.rate_limiter.wait();

        let duration = fingerprint.duration_secs.to_string();
        let params = [
            ("client", api_key),
            ("format", "json"),
            ("meta", "recordings"),
            ("duration", duration.as_str()),
            ("fingerprint", fingerprint.encoded.as_str()),
        ];

        log::debug!(
            "Querying AcoustID ({}s, {} char fingerprint)",
            fingerprint.duration_secs,
            fingerprint.encoded.len()
        );

        let response = self
            .http_client
            .post(&self.lookup_url)
            .form(&params)
            .send()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(LookupError::Authentication(
                "rejected by AcoustID (HTTP 401)".to_string(),
            ));
        }

        let body = response
            .text()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        // Errors come back as JSON with a 4xx status
        match parse_lookup_response(&body) {
            Err(LookupError::MalformedResponse(_)) if !status.is_success() => {
                Err(LookupError::Api(status.as_u16(), body))
            }
            Ok(matches) => {
                log::info!(
                    "AcoustID lookup returned {} recording(s){}",
                    matches.len(),
                    matches
                        .first()
                        .map(|m| format!(", best score {:.2}", m.score))
                        .unwrap_or_default()
                );
                Ok(matches)
            }
            Err(e) => Err(e),
        }
    }
}

impl MatchLookup for AcoustIdClient {
    fn lookup(&self, audio_path: &Path, api_key: &str) -> Result<Vec<RawMatch>, LookupError> {
        let fingerprint = self.fingerprinter.fingerprint_file(audio_path)?;
        self.lookup_fingerprint(&fingerprint, api_key)
    }
}
