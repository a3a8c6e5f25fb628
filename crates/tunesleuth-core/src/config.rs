//! Configuration parameters for pre-processing and lookup
//!
//! Defaults reproduce the librosa-style framing the denoiser was tuned with
//! and the request limits published for the AcoustID web service.

use serde::{Deserialize, Serialize};

/// Sample rate every waveform is normalized to before processing
pub const TARGET_SAMPLE_RATE: u32 = 22050;

/// Public AcoustID lookup endpoint
pub const ACOUSTID_LOOKUP_URL: &str = "https://api.acoustid.org/v2/lookup";

/// Spectral-subtraction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseConfig {
    pub sample_rate: u32,
    pub fft_size: usize,
    pub hop_size: usize,

    /// Percentile of per-bin magnitude taken as the noise floor
    pub noise_percentile: f32,
    /// Fraction of the noise floor removed from each magnitude
    pub subtraction_factor: f32,
    /// Share of the original magnitude that always survives
    pub magnitude_floor: f32,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            sample_rate: TARGET_SAMPLE_RATE,
            fft_size: 2048,
            hop_size: 512,
            noise_percentile: 20.0,
            subtraction_factor: 0.3,
            magnitude_floor: 0.1,
        }
    }
}

impl DenoiseConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sample_rate == 0 {
            anyhow::bail!("Sample rate must be > 0");
        }
        if self.fft_size < 4 || self.fft_size % 2 != 0 {
            anyhow::bail!("fft_size must be an even number >= 4");
        }
        // Hann windows only overlap-add to a usable envelope up to 50% hop
        if self.hop_size == 0 || self.hop_size > self.fft_size / 2 {
            anyhow::bail!("hop_size must be in 1..=fft_size/2");
        }
        if !(0.0..=100.0).contains(&self.noise_percentile) {
            anyhow::bail!("noise_percentile must be within [0, 100]");
        }
        if self.subtraction_factor.is_nan() || self.subtraction_factor < 0.0 {
            anyhow::bail!("subtraction_factor must be >= 0");
        }
        if !(0.0..=1.0).contains(&self.magnitude_floor) {
            anyhow::bail!("magnitude_floor must be within [0, 1]");
        }
        Ok(())
    }
}

/// Recognition pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Run spectral subtraction before fingerprinting
    pub denoise: bool,
    pub denoise_params: DenoiseConfig,

    // Fingerprinting
    pub sample_rate: u32,
    pub fingerprint_seconds: u32,

    // AcoustID web service
    pub lookup_url: String,
    pub timeout_secs: u64,
    pub rate_limit_ms: u64,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            denoise: false,
            denoise_params: DenoiseConfig::default(),

            sample_rate: TARGET_SAMPLE_RATE,
            fingerprint_seconds: 120,

            lookup_url: ACOUSTID_LOOKUP_URL.to_string(),
            timeout_secs: 30,
            // 3 requests per second
            rate_limit_ms: 334,
        }
    }
}

impl RecognizerConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sample_rate == 0 {
            anyhow::bail!("Sample rate must be > 0");
        }
        if self.fingerprint_seconds == 0 {
            anyhow::bail!("fingerprint_seconds must be > 0");
        }
        if self.lookup_url.is_empty() {
            anyhow::bail!("lookup_url must not be empty");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be > 0");
        }
        self.denoise_params.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(DenoiseConfig::default().validate().is_ok());
        assert!(RecognizerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_denoising_is_opt_in() {
        assert!(!RecognizerConfig::default().denoise);
    }

    #[test]
    fn test_rejects_bad_hop() {
        let config = DenoiseConfig {
            hop_size: 4096,
            ..DenoiseConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_odd_fft_size() {
        let config = DenoiseConfig {
            fft_size: 1023,
            ..DenoiseConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_nan_factor() {
        let config = DenoiseConfig {
            subtraction_factor: f32::NAN,
            ..DenoiseConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nested_denoise_params_are_validated() {
        let mut config = RecognizerConfig::default();
        config.denoise_params.magnitude_floor = 1.5;
        assert!(config.validate().is_err());
    }
}
