//! Microphone capture into a scratch WAV

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tunesleuth_core::audio::{resample_to_target, ScratchWav};
use tunesleuth_core::config::TARGET_SAMPLE_RATE;

/// Record `seconds` of audio from the default input device
///
/// The capture is mixed to mono, resampled to the pipeline rate and written
/// to a scratch WAV that is removed when dropped.
pub fn record(seconds: u32) -> Result<ScratchWav> {
    if seconds == 0 {
        anyhow::bail!("Recording duration must be > 0 seconds");
    }

    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("No default input device available")?;
    let config = device
        .default_input_config()
        .context("Failed to get default input config")?;

    let channels = config.channels() as usize;
    let sample_rate = config.sample_rate().0;
    log::info!(
        "Recording from {} ({} Hz, {} channel(s))",
        device.name().unwrap_or_else(|_| "(unnamed)".to_string()),
        sample_rate,
        channels
    );

    let captured = Arc::new(Mutex::new(Vec::<f32>::new()));
    let sink = Arc::clone(&captured);
    let stream = device
        .build_input_stream(
            &config.into(),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut samples) = sink.lock() {
                    samples.extend(
                        data.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
                    );
                }
            },
            |err| log::error!("Input stream error: {}", err),
            None,
        )
        .context("Failed to build input stream")?;

    println!("Recording for {} seconds...", seconds);
    println!("Start humming or singing now!");
    stream.play().context("Failed to start input stream")?;

    let duration = Duration::from_secs(seconds as u64);
    let start = Instant::now();
    let mut announced = 0;
    while start.elapsed() < duration {
        let elapsed = start.elapsed().as_secs() as u32;
        if elapsed >= announced {
            println!("{} seconds remaining...", seconds - elapsed);
            announced = elapsed + 1;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    drop(stream);

    let samples = match captured.lock() {
        Ok(samples) => samples.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };
    if samples.is_empty() {
        anyhow::bail!("No audio captured from the input device");
    }

    let resampled = resample_to_target(&samples, sample_rate, TARGET_SAMPLE_RATE)?;
    let scratch = ScratchWav::write_pcm16(&resampled, TARGET_SAMPLE_RATE)?;
    println!("Recording complete!");
    log::info!(
        "Captured {} samples to {}",
        scratch.num_samples(),
        scratch.path().display()
    );

    Ok(scratch)
}
