//! Error types for survey-core operations.

use std::path::PathBuf;

/// All errors that can occur in survey-core operations.
///
/// Most failures in this crate degrade gracefully (skipped lines, discarded
/// telemetry, stale enrichment). Only the variants below surface to callers.
#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Journal folder not found at {0}")]
    JournalDirNotFound(PathBuf),

    #[error("Settings file malformed: {path}: {details}")]
    SettingsMalformed { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // State Errors
    // ─────────────────────────────────────────────────────────────────────
    /// Derived state is missing something it must have. Continuing would
    /// corrupt persisted annotations, so callers treat this as fatal.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("No current body")]
    NoCurrentBody,

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl SurveyError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SurveyError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        SurveyError::Json {
            context: context.into(),
            source,
        }
    }

    /// True for errors that signal a logic defect rather than an environment problem.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SurveyError::InvariantViolation(_))
    }
}

/// Convenience type alias for Results using SurveyError.
pub type Result<T> = std::result::Result<T, SurveyError>;
