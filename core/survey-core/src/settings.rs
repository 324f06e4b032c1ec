//! Runtime settings loaded from `~/.survey/settings.toml`.
//!
//! Every field has a default, so a missing file (or a partial one) is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{Result, SurveyError};

pub const DEFAULT_PROCESS_NAME: &str = "EliteDangerous64";
pub const DEFAULT_MAX_DEEP_FILES: usize = 50;
pub const DEFAULT_PROCESS_POLL_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Overrides the journal folder from `StorageConfig`.
    pub journal_folder: Option<PathBuf>,
    /// Commander to follow when several play on this machine.
    pub preferred_commander: Option<String>,
    /// Executable name (without extension) of the game process.
    pub process_name: String,
    /// Ask the enrichment provider about each newly arrived system.
    pub auto_load_enrichment: bool,
    /// Upper bound on files opened by a single deep search.
    pub max_deep_files: usize,
    pub process_poll_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            journal_folder: None,
            preferred_commander: None,
            process_name: DEFAULT_PROCESS_NAME.to_string(),
            auto_load_enrichment: true,
            max_deep_files: DEFAULT_MAX_DEEP_FILES,
            process_poll_secs: DEFAULT_PROCESS_POLL_SECS,
        }
    }
}

impl Settings {
    /// Reads settings, treating a missing file as defaults.
    pub fn load(path: &Path) -> Result<Settings> {
        if !path.exists() {
            return Ok(Settings::default());
        }

        let content = fs_err::read_to_string(path)
            .map_err(|err| SurveyError::io("Failed to read settings", err))?;
        toml::from_str::<Settings>(&content).map_err(|err| SurveyError::SettingsMalformed {
            path: path.to_path_buf(),
            details: err.to_string(),
        })
    }

    /// Like [`Settings::load`], but falls back to defaults on any error.
    pub fn load_or_default(path: &Path) -> Settings {
        match Settings::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(error = %err, "Failed to load settings; using defaults");
                Settings::default()
            }
        }
    }
}
