//! TOML settings file
//!
//! ```toml
//! [acoustid]
//! api_key = "..."
//! endpoint = "https://api.acoustid.org/v2/lookup"
//! timeout_secs = 30
//!
//! [recognition]
//! max_results = 3
//! denoise = false
//!
//! [denoise]
//! noise_percentile = 20.0
//! subtraction_factor = 0.3
//! ```
//!
//! Every section and key is optional.

use crate::config::{DenoiseConfig, RecognizerConfig, ACOUSTID_LOOKUP_URL};
use crate::recognizer::DEFAULT_MAX_RESULTS;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main settings structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub acoustid: AcoustIdSettings,
    #[serde(default)]
    pub recognition: RecognitionSettings,
    #[serde(default)]
    pub denoise: DenoiseConfig,
}

/// AcoustID web service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcoustIdSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
}

impl Default for AcoustIdSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            rate_limit_ms: default_rate_limit_ms(),
        }
    }
}

fn default_endpoint() -> String {
    ACOUSTID_LOOKUP_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_rate_limit_ms() -> u64 {
    334
}

/// Recognition settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecognitionSettings {
    #[serde(default = "default_max_results")]
    pub max_results: i64,
    #[serde(default)]
    pub denoise: bool,
    #[serde(default = "default_fingerprint_seconds")]
    pub fingerprint_seconds: u32,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            denoise: false,
            fingerprint_seconds: default_fingerprint_seconds(),
        }
    }
}

fn default_max_results() -> i64 {
    DEFAULT_MAX_RESULTS as i64
}
fn default_fingerprint_seconds() -> u32 {
    120
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read settings file {}: {}", path.display(), e)
        })?;
        let settings: Settings = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML settings: {}", e))?;
        Ok(settings)
    }

    /// API key from the file, ignoring blank values
    pub fn api_key(&self) -> Option<&str> {
        self.acoustid
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Pipeline configuration described by these settings
    pub fn recognizer_config(&self) -> RecognizerConfig {
        RecognizerConfig {
            denoise: self.recognition.denoise,
            denoise_params: self.denoise.clone(),
            fingerprint_seconds: self.recognition.fingerprint_seconds,
            lookup_url: self.acoustid.endpoint.clone(),
            timeout_secs: self.acoustid.timeout_secs,
            rate_limit_ms: self.acoustid.rate_limit_ms,
            ..RecognizerConfig::default()
        }
    }
}
