//! Human readable and JSON output formatting

use serde::Serialize;
use std::fmt::Write;
use tunesleuth_core::{Recognition, RecognitionStatus};

/// Where to obtain an AcoustID application key
pub const API_KEY_URL: &str = "https://acoustid.org/new-application";

#[derive(Serialize)]
struct RecognitionOutput<'a> {
    queries: usize,
    matched: usize,
    results: &'a [Recognition],
}

/// Render one recognition for the terminal
pub fn render_recognition(recognition: &Recognition) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "File: {}", recognition.query_path);
    if recognition.denoised {
        let _ = writeln!(out, "(looked up on denoised audio)");
    }

    match &recognition.status {
        RecognitionStatus::Matched => {
            let _ = writeln!(out, "Found {} match(es)!", recognition.candidates.len());
            let _ = writeln!(out, "{}", "=".repeat(60));
            for (i, candidate) in recognition.candidates.iter().enumerate() {
                if i > 0 {
                    let _ = writeln!(out, "{}", "-".repeat(40));
                }
                let _ = writeln!(
                    out,
                    "Match #{} (Confidence: {:.1}%)",
                    i + 1,
                    candidate.score * 100.0
                );
                let _ = writeln!(out, "Title: {}", candidate.title);
                let _ = writeln!(out, "Artist(s): {}", candidate.artist);
            }
        }
        RecognitionStatus::NoMatch => {
            let _ = writeln!(out, "No matches found!");
            let _ = writeln!(out);
            let _ = writeln!(out, "Tips for better recognition:");
            let _ = writeln!(out, "  - Try popular, well-known songs");
            let _ = writeln!(out, "  - Use clear, high-quality audio");
            let _ = writeln!(out, "  - Record for 15+ seconds");
            let _ = writeln!(out, "  - Try --denoise for noisy recordings");
        }
        RecognitionStatus::NotFound => {
            let _ = writeln!(out, "File not found: {}", recognition.query_path);
        }
        RecognitionStatus::AuthenticationFailed { message } => {
            let _ = writeln!(out, "Error looking up AcoustID: {}", message);
            let _ = writeln!(out, "Please check your AcoustID API key");
            let _ = writeln!(out, "Get a new key from: {}", API_KEY_URL);
        }
        RecognitionStatus::LookupFailed { message } => {
            let _ = writeln!(out, "Error looking up AcoustID: {}", message);
            let _ = writeln!(out, "Please check your internet connection and try again");
        }
    }
    out
}

/// Print recognitions for the terminal
pub fn print_recognitions(recognitions: &[Recognition]) {
    for (i, recognition) in recognitions.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print!("{}", render_recognition(recognition));
    }
}

/// Print recognitions as one JSON document
pub fn print_json_results(recognitions: &[Recognition]) {
    let output = RecognitionOutput {
        queries: recognitions.len(),
        matched: recognitions.iter().filter(|r| r.is_match()).count(),
        results: recognitions,
    };

    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing results: {}", e),
    }
}

/// Banner shown when the binary is run without arguments
pub fn render_banner(api_key_found: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "tunesleuth - audio recognition");
    let _ = writeln!(out, "{}", "=".repeat(30));
    let _ = writeln!(out, "Recognize songs from audio files, humming, or singing!");
    let _ = writeln!(out);

    if api_key_found {
        let _ = writeln!(out, "API key found");
        let _ = writeln!(out);
        let _ = writeln!(out, "Ready to use! Try:");
        let _ = writeln!(out, "  tunesleuth --file your_song.mp3");
        let _ = writeln!(out, "  tunesleuth --record 15");
    } else {
        let _ = writeln!(out, "No API key found");
        let _ = writeln!(out, "Get your free API key from: {}", API_KEY_URL);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Usage examples:");
    let _ = writeln!(out, "  tunesleuth --api-key YOUR_KEY --file song.mp3");
    let _ = writeln!(out, "  tunesleuth --api-key YOUR_KEY --record 10");
    let _ = writeln!(out, "  tunesleuth --help");
    out
}

/// Help shown when no API key could be resolved
pub fn render_missing_api_key() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "No API key provided!");
    let _ = writeln!(out);
    let _ = writeln!(out, "Options:");
    let _ = writeln!(out, "1. Use: --api-key YOUR_KEY");
    let _ = writeln!(out, "2. Set environment: export ACOUSTID_API_KEY=your_key");
    let _ = writeln!(out, "3. Add to tunesleuth.toml: [acoustid] api_key = \"your_key\"");
    let _ = writeln!(out);
    let _ = writeln!(out, "Get your free API key from: {}", API_KEY_URL);
    out
}
