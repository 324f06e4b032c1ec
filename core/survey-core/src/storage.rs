//! Storage configuration and path management.
//!
//! `StorageConfig` owns every path the engine reads or writes:
//!
//! - the game's journal folder (read-only for us: journals, `Status.json`, `NavRoute.json`)
//! - our own data root (`~/.survey`: settings, per-system and per-commander state, logs)
//!
//! Tests use [`StorageConfig::with_roots`] to point both at temp directories.

use std::path::{Path, PathBuf};

pub const STATUS_FILE_NAME: &str = "Status.json";
pub const NAV_ROUTE_FILE_NAME: &str = "NavRoute.json";
pub const JOURNAL_EXTENSION: &str = "log";

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for our data (default: ~/.survey)
    root: PathBuf,
    /// Folder the game writes journals and status files into
    journal_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            root: home.join(".survey"),
            journal_root: default_journal_folder(&home),
        }
    }
}

/// Where the game writes its journals on a standard install.
pub fn default_journal_folder(home: &Path) -> PathBuf {
    home.join("Saved Games")
        .join("Frontier Developments")
        .join("Elite Dangerous")
}

impl StorageConfig {
    pub fn with_roots(root: PathBuf, journal_root: PathBuf) -> Self {
        Self { root, journal_root }
    }

    /// Same data root, different journal folder (settings override).
    pub fn with_journal_root(&self, journal_root: PathBuf) -> Self {
        Self {
            root: self.root.clone(),
            journal_root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn journal_root(&self) -> &Path {
        &self.journal_root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Game files
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn status_file(&self) -> PathBuf {
        self.journal_root.join(STATUS_FILE_NAME)
    }

    pub fn nav_route_file(&self) -> PathBuf {
        self.journal_root.join(NAV_ROUTE_FILE_NAME)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Our files
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn settings_file(&self) -> PathBuf {
        self.root.join("settings.toml")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Per-system annotation files, keyed by system address.
    pub fn systems_dir(&self) -> PathBuf {
        self.root.join("systems")
    }

    pub fn system_file(&self, address: u64) -> PathBuf {
        self.systems_dir().join(format!("{}.json", address))
    }

    /// Cached third-party system metadata, one JSON file per system name.
    pub fn enrichment_dir(&self) -> PathBuf {
        self.root.join("enrichment")
    }

    pub fn commanders_dir(&self) -> PathBuf {
        self.root.join("commanders")
    }

    /// Example: ~/.survey/commanders/F1234567.json
    pub fn commander_file(&self, fid: &str) -> PathBuf {
        self.commanders_dir()
            .join(format!("{}.json", Self::encode_key(fid)))
    }

    /// Keeps keys usable as file names.
    fn encode_key(key: &str) -> String {
        key.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect()
    }

    /// True if `path` looks like a journal file (`Journal.*.log`).
    pub fn is_journal_file(path: &Path) -> bool {
        let has_ext = path
            .extension()
            .map(|ext| ext == JOURNAL_EXTENSION)
            .unwrap_or(false);
        let has_prefix = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with("Journal"))
            .unwrap_or(false);
        has_ext && has_prefix
    }
}
