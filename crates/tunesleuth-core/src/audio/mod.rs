//! Audio decoding, resampling and scratch WAV output
//!
//! WAV, MP3, FLAC and OGG go through dedicated pure Rust decoders; every other
//! container is handed to Symphonia.

mod container;
mod decoder;
mod resample;
mod scratch;

pub use container::decode_with_symphonia;
pub use decoder::{decode_audio, AudioData};
pub use resample::resample_to_target;
pub use scratch::{quantize_pcm16, ScratchWav};

use std::path::Path;

/// Audio formats with a dedicated decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,

    /// Anything else, probed by Symphonia (m4a, aac, mkv, webm, ...)
    Other,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("wav") | Some("wave") => AudioFormat::Wav,
            Some("mp3") => AudioFormat::Mp3,
            Some("flac") => AudioFormat::Flac,
            Some("ogg") | Some("oga") => AudioFormat::Ogg,
            _ => AudioFormat::Other,
        }
    }
}
