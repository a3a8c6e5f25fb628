//! Band-limited resampling with rubato

use anyhow::Result;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

const CHUNK_SIZE: usize = 1024;

/// Resample mono audio to the target sample rate
///
/// The resampler delay is removed so the output lines up with the input and
/// has `len * to_rate / from_rate` samples.
pub fn resample_to_target(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == 0 || to_rate == 0 {
        anyhow::bail!("Invalid sample rates: {} -> {}", from_rate, to_rate);
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        oversampling_factor: 128,
        interpolation: SincInterpolationType::Linear,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_SIZE, 1)?;

    let expected_len = (samples.len() as f64 * ratio).round() as usize;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected_len + delay + CHUNK_SIZE);

    let mut position = 0;
    while position + CHUNK_SIZE <= samples.len() {
        let block = resampler.process(&[&samples[position..position + CHUNK_SIZE]], None)?;
        output.extend_from_slice(&block[0]);
        position += CHUNK_SIZE;
    }

    if position < samples.len() {
        let block = resampler.process_partial(Some(&[&samples[position..]]), None)?;
        output.extend_from_slice(&block[0]);
    }

    // Flush the filter tail
    let flush: Option<&[Vec<f32>]> = None;
    while output.len() < expected_len + delay {
        let block = resampler.process_partial(flush, None)?;
        if block[0].is_empty() {
            break;
        }
        output.extend_from_slice(&block[0]);
    }

    output.drain(..delay.min(output.len()));
    output.resize(expected_len, 0.0);

    log::trace!(
        "Resampled {} samples @ {}Hz -> {} samples @ {}Hz",
        samples.len(),
        from_rate,
        output.len(),
        to_rate
    );

    Ok(output)
}
