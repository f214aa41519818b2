//! Server configuration, read from a `settings.json` placed next to the
//! binary (build.rs stages it into the target dir). A missing or partial
//! file falls back to defaults.

use serde::Deserialize;
use std::fs;

const SETTINGS_FILENAME: &str = "settings.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind_address: String,
    pub port: u16,
    pub database_path: String,
    /// Built frontend served as static files, with index fallback.
    pub static_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bind_address: "0.0.0.0".to_string(),
            port: 3001,
            database_path: "planner.redb".to_string(),
            static_dir: "dist".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Settings {
        match fs::read_to_string(SETTINGS_FILENAME) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(error = %e, "invalid {SETTINGS_FILENAME}, using defaults");
                    Settings::default()
                }
            },
            Err(_) => Settings::default(),
        }
    }
}
