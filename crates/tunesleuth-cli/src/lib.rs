//! tunesleuth command line support

pub mod output;

#[cfg(feature = "microphone")]
pub mod record;

use std::path::Path;
use tunesleuth_core::Settings;

/// Settings file picked up from the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "tunesleuth.toml";

/// Environment variable holding the AcoustID key
pub const API_KEY_ENV: &str = "ACOUSTID_API_KEY";

/// Load settings from `path`, or from `./tunesleuth.toml` when present
///
/// An explicit path must exist; the implicit default is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => Settings::load(path),
        None => {
            let default = Path::new(DEFAULT_SETTINGS_FILE);
            if default.is_file() {
                log::info!("Loading settings from {}", default.display());
                Settings::load(default)
            } else {
                Ok(Settings::default())
            }
        }
    }
}

/// Pick the API key: command line (or environment) first, then settings
pub fn resolve_api_key(cli_key: Option<&str>, settings: &Settings) -> Option<String> {
    cli_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .or_else(|| settings.api_key())
        .map(str::to_string)
}
