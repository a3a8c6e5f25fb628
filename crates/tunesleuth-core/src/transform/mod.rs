//! Short-time Fourier transform and its overlap-add inverse
//!
//! Frames are centered on multiples of the hop size, with the signal
//! reflect-padded by half a window on each side, and weighted by a periodic
//! Hann window. The inverse divides by the summed squared window, so a
//! forward/inverse round trip restores the input.

use anyhow::Result;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

/// Complex time-frequency representation
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// Complex bins [time_frame][frequency_bin]
    pub frames: Vec<Vec<Complex<f32>>>,
    /// Number of time frames
    pub num_frames: usize,
    /// Number of frequency bins (fft_size / 2 + 1)
    pub num_bins: usize,
    pub fft_size: usize,
    pub hop_size: usize,
    /// Length of the analyzed signal, restored by the inverse
    pub signal_len: usize,
}

impl Spectrogram {
    /// Magnitude per [frame][bin]
    pub fn magnitudes(&self) -> Vec<Vec<f32>> {
        self.frames
            .iter()
            .map(|frame| frame.iter().map(|c| c.norm()).collect())
            .collect()
    }

    /// Phase angle per [frame][bin]
    pub fn phases(&self) -> Vec<Vec<f32>> {
        self.frames
            .iter()
            .map(|frame| frame.iter().map(|c| c.arg()).collect())
            .collect()
    }

    /// Replace every bin with `magnitude * e^(i * phase)`
    pub fn set_polar(&mut self, magnitudes: &[Vec<f32>], phases: &[Vec<f32>]) -> Result<()> {
        if magnitudes.len() != self.num_frames || phases.len() != self.num_frames {
            anyhow::bail!(
                "Frame count mismatch: {} magnitudes, {} phases, {} frames",
                magnitudes.len(),
                phases.len(),
                self.num_frames
            );
        }

        for ((frame, mags), phis) in self.frames.iter_mut().zip(magnitudes).zip(phases) {
            if mags.len() != self.num_bins || phis.len() != self.num_bins {
                anyhow::bail!("Bin count mismatch, expected {}", self.num_bins);
            }
            for ((bin, &m), &p) in frame.iter_mut().zip(mags).zip(phis) {
                *bin = Complex::from_polar(m, p);
            }
        }
        Ok(())
    }
}

/// Compute the short-time Fourier transform of a mono signal
pub fn stft(samples: &[f32], fft_size: usize, hop_size: usize) -> Result<Spectrogram> {
    if samples.is_empty() {
        anyhow::bail!("Cannot transform an empty signal");
    }
    if fft_size < 2 || fft_size % 2 != 0 {
        anyhow::bail!("FFT size must be even, got {}", fft_size);
    }
    if hop_size == 0 || hop_size > fft_size {
        anyhow::bail!("Hop size must be in 1..={}, got {}", fft_size, hop_size);
    }

    let padded = reflect_pad(samples, fft_size / 2);
    let num_frames = 1 + (padded.len() - fft_size) / hop_size;
    let num_bins = fft_size / 2 + 1;

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    let window = create_hann_window(fft_size);

    let mut frames = Vec::with_capacity(num_frames);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); fft_size];

    for frame_idx in 0..num_frames {
        let start = frame_idx * hop_size;
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = Complex::new(padded[start + i] * window[i], 0.0);
        }

        fft.process(&mut buffer);
        frames.push(buffer[..num_bins].to_vec());
    }

    Ok(Spectrogram {
        frames,
        num_frames,
        num_bins,
        fft_size,
        hop_size,
        signal_len: samples.len(),
    })
}

/// Reconstruct a signal from its spectrogram by weighted overlap-add
pub fn istft(spectrogram: &Spectrogram) -> Result<Vec<f32>> {
    let fft_size = spectrogram.fft_size;
    let hop_size = spectrogram.hop_size;

    if spectrogram.num_frames == 0 {
        anyhow::bail!("Spectrogram has no frames");
    }
    if spectrogram.num_bins != fft_size / 2 + 1 {
        anyhow::bail!(
            "Spectrogram has {} bins, expected {}",
            spectrogram.num_bins,
            fft_size / 2 + 1
        );
    }

    let mut planner = FftPlanner::new();
    let ifft = planner.plan_fft_inverse(fft_size);
    let window = create_hann_window(fft_size);

    let output_len = fft_size + hop_size * (spectrogram.num_frames - 1);
    let mut output = vec![0.0f32; output_len];
    let mut window_sum = vec![0.0f32; output_len];
    let mut buffer = vec![Complex::new(0.0f32, 0.0); fft_size];
    let scale = 1.0 / fft_size as f32;

    for (frame_idx, frame) in spectrogram.frames.iter().enumerate() {
        if frame.len() != spectrogram.num_bins {
            anyhow::bail!("Frame {} has {} bins", frame_idx, frame.len());
        }

        // Rebuild the full Hermitian spectrum
        buffer[..spectrogram.num_bins].copy_from_slice(frame);
        for k in 1..fft_size / 2 {
            buffer[fft_size - k] = frame[k].conj();
        }

        ifft.process(&mut buffer);

        let start = frame_idx * hop_size;
        for i in 0..fft_size {
            output[start + i] += buffer[i].re * scale * window[i];
            window_sum[start + i] += window[i] * window[i];
        }
    }

    for (sample, &norm) in output.iter_mut().zip(&window_sum) {
        if norm > f32::EPSILON {
            *sample /= norm;
        }
    }

    let offset = fft_size / 2;
    let end = (offset + spectrogram.signal_len).min(output.len());
    let mut signal = output[offset..end].to_vec();
    signal.resize(spectrogram.signal_len, 0.0);

    Ok(signal)
}

/// Periodic Hann window
fn create_hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}

/// Pad both ends by mirroring around the edge samples
fn reflect_pad(samples: &[f32], pad: usize) -> Vec<f32> {
    let len = samples.len();
    let total = len + 2 * pad;
    (0..total)
        .map(|i| samples[reflect_index(i as isize - pad as isize, len)])
        .collect()
}

fn reflect_index(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let m = i.rem_euclid(period);
    if m < len as isize {
        m as usize
    } else {
        (period - m) as usize
    }
}
