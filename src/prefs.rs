//! User preferences persistence.
//!
//! Reads user preferences from ~/.config/globalping/config.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// User preferences
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefs {
    /// API token for higher rate limits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Run IDs kept for the share link
    pub max_history: Option<usize>,
    /// Packets per probe for chained runs
    pub packets_per_run: Option<u16>,
    /// Measurement API base URL
    pub api_url: Option<String>,
}

impl Prefs {
    /// Get config file path: ~/.config/globalping/config.toml
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("globalping").join("config.toml"))
    }

    /// Load preferences from disk (returns default if missing/invalid)
    pub fn load() -> Self {
        Self::path().map(|p| Self::load_from(&p)).unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }
}
