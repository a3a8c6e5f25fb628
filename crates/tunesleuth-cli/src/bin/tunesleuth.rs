//! tunesleuth - identify songs from audio files or the microphone
//!
//! Usage:
//!   tunesleuth --api-key KEY song.mp3            # Recognize a file
//!   tunesleuth --file a.mp3 --file b.wav --json  # Several files, JSON output
//!   tunesleuth --record 15                       # Record from the microphone
//!   tunesleuth --denoise noisy_clip.wav          # Clean the audio first

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tunesleuth_cli::output::{
    print_json_results, print_recognitions, render_banner, render_missing_api_key,
};
use tunesleuth_cli::{load_settings, resolve_api_key, API_KEY_ENV};
use tunesleuth_core::{clamp_max_results, Recognizer};

#[derive(Parser, Debug)]
#[command(name = "tunesleuth")]
#[command(about = "Recognize songs using Chromaprint + AcoustID", long_about = None)]
struct Args {
    /// AcoustID API key
    #[arg(short = 'k', long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Audio file to recognize (repeatable)
    #[arg(short, long = "file", value_name = "FILE")]
    file: Vec<PathBuf>,

    /// Audio files to recognize
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,

    /// Record from the microphone for N seconds
    #[arg(short, long, value_name = "SECONDS")]
    record: Option<u32>,

    /// Maximum number of results per file (1-10)
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    max_results: Option<i64>,

    /// Reduce background noise before fingerprinting
    #[arg(short, long)]
    denoise: bool,

    /// Path to settings file (TOML). Defaults to ./tunesleuth.toml if present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging (-vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    if std::env::args_os().len() <= 1 {
        let settings = load_settings(None).unwrap_or_default();
        let env_key = std::env::var(API_KEY_ENV).ok();
        let found = resolve_api_key(env_key.as_deref(), &settings).is_some();
        print!("{}", render_banner(found));
        return Ok(());
    }

    let args = Args::parse();

    // Initialize logger
    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let settings = load_settings(args.config.as_deref())?;

    let Some(api_key) = resolve_api_key(args.api_key.as_deref(), &settings) else {
        eprint!("{}", render_missing_api_key());
        anyhow::bail!("No API key provided");
    };

    let requested = args.max_results.unwrap_or(settings.recognition.max_results);
    let max_results = clamp_max_results(requested);
    if max_results as i64 != requested {
        log::warn!("max-results {} clamped to {}", requested, max_results);
    }

    let mut config = settings.recognizer_config();
    if args.denoise {
        config.denoise = true;
    }
    config.validate()?;

    let mut inputs: Vec<PathBuf> = args.file.into_iter().chain(args.files).collect();

    // Held until recognition is done, the scratch file is removed on drop
    let _recording = match args.record {
        Some(seconds) => {
            let scratch = record(seconds)?;
            inputs.push(scratch.path().to_path_buf());
            Some(scratch)
        }
        None => None,
    };

    if inputs.is_empty() {
        eprintln!("Please provide either --file or --record option");
        eprintln!("Use --help for usage examples");
        anyhow::bail!("No input given");
    }

    log::info!(
        "Recognizing {} input(s), up to {} result(s) each{}",
        inputs.len(),
        max_results,
        if config.denoise { ", denoising" } else { "" }
    );

    let recognizer = Recognizer::new(api_key, config)?;
    let recognitions = recognizer.recognize_batch(inputs.as_slice(), max_results);

    if args.json {
        print_json_results(&recognitions);
    } else {
        print_recognitions(&recognitions);
    }

    Ok(())
}

#[cfg(feature = "microphone")]
fn record(seconds: u32) -> Result<tunesleuth_core::audio::ScratchWav> {
    tunesleuth_cli::record::record(seconds)
}

#[cfg(not(feature = "microphone"))]
fn record(_seconds: u32) -> Result<tunesleuth_core::audio::ScratchWav> {
    anyhow::bail!("Microphone recording requires building with the `microphone` feature")
}
