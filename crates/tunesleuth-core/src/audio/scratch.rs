//! Temporary 16-bit PCM WAV files
//!
//! The file is removed when the [`ScratchWav`] is dropped, whichever way the
//! owning call returns.

use anyhow::{Context, Result};
use std::path::Path;
use tempfile::TempPath;

/// Mono 16-bit PCM WAV file in the system temp directory
#[derive(Debug)]
pub struct ScratchWav {
    path: TempPath,
    sample_rate: u32,
    num_samples: usize,
}

impl ScratchWav {
    /// Clip, quantize and write mono samples
    pub fn write_pcm16(samples: &[f32], sample_rate: u32) -> Result<Self> {
        let path = tempfile::Builder::new()
            .prefix("tunesleuth-")
            .suffix(".wav")
            .tempfile()
            .context("Failed to allocate scratch file")?
            .into_temp_path();

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;
        for &sample in samples {
            writer.write_sample(quantize_pcm16(sample))?;
        }
        writer.finalize()?;

        log::debug!(
            "Wrote {} samples @ {}Hz to {}",
            samples.len(),
            sample_rate,
            path.display()
        );

        Ok(Self {
            path,
            sample_rate,
            num_samples: samples.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }
}

/// Clip to [-1, 1] and scale to the 16-bit range, truncating toward zero
pub fn quantize_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}
