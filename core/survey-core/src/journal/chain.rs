//! Navigation between chronologically rotated journal files.
//!
//! The game starts a new journal file per session (and splits long sessions
//! into parts). Several commanders may share one folder, so finding "the file
//! before this one" means finding the newest older file written by the same
//! commander on the same game variant.

use chrono::{DateTime, Utc};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::file::{last_write_time, JournalFile};
use super::record::Record;
use crate::error::{Result, SurveyError};
use crate::storage::StorageConfig;

#[derive(Debug, Clone)]
pub struct ChainNavigator {
    journal_root: PathBuf,
    max_files: usize,
}

impl ChainNavigator {
    pub fn new(journal_root: PathBuf, max_files: usize) -> Self {
        Self {
            journal_root,
            max_files: max_files.max(1),
        }
    }

    pub fn journal_root(&self) -> &Path {
        &self.journal_root
    }

    /// Upper bound on historical files a single deep search may open.
    pub fn max_files(&self) -> usize {
        self.max_files
    }

    /// Journal files strictly older than `before`, newest first.
    fn candidates(&self, before: DateTime<Utc>) -> Result<Vec<PathBuf>> {
        let entries = fs_err::read_dir(&self.journal_root)
            .map_err(|_| SurveyError::JournalDirNotFound(self.journal_root.clone()))?;

        let mut files: Vec<(DateTime<Utc>, PathBuf)> = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !StorageConfig::is_journal_file(&path) {
                continue;
            }
            match last_write_time(&path) {
                Ok(written) if written < before => files.push((written, path)),
                Ok(_) => {}
                Err(err) => debug!(error = %err, "Skipping unreadable journal candidate"),
            }
        }

        files.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(files.into_iter().map(|(_, path)| path).collect())
    }

    /// Finds the newest journal older than `before` for `identity`.
    ///
    /// Unknown identity returns the newest candidate outright. A `variant` of
    /// `None` accepts files of either game variant.
    pub fn find_predecessor(
        &self,
        identity: Option<&str>,
        variant: Option<bool>,
        before: DateTime<Utc>,
    ) -> Result<Option<PathBuf>> {
        let candidates = self.candidates(before)?;

        let Some(identity) = identity.filter(|name| !name.trim().is_empty()) else {
            return Ok(candidates.into_iter().next());
        };

        for path in candidates {
            if owner_of(&path, identity, variant) == Owner::Matches {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Newest journal for `identity`, regardless of age.
    ///
    /// The newest file is taken while its commander is still unwritten: the
    /// game creates the file at launch but names the commander only once one
    /// is loaded.
    pub fn find_latest(&self, identity: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(identity) = identity.filter(|name| !name.trim().is_empty()) {
            let newest = self.candidates(DateTime::<Utc>::MAX_UTC)?.into_iter().next();
            if let Some(newest) = newest {
                if owner_of(&newest, identity, None) == Owner::Undecided {
                    debug!(path = %newest.display(), "Newest journal has no commander yet");
                    return Ok(Some(newest));
                }
            }
        }
        self.find_predecessor(identity, None, DateTime::<Utc>::MAX_UTC)
    }

    /// Lazy sequence of the files preceding `file`, newest first.
    pub fn chain_from(&self, file: &JournalFile) -> JournalChain<'_> {
        JournalChain {
            navigator: self,
            operator: file.operator().map(str::to_string),
            variant: Some(file.is_odyssey()),
            before: file.last_write(),
            done: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    Matches,
    Other,
    /// No commander line yet.
    Undecided,
}

/// Reads `path` top-down only until its identity is decided.
fn owner_of(path: &Path, identity: &str, variant: Option<bool>) -> Owner {
    let file = match fs_err::File::open(path) {
        Ok(file) => file,
        Err(err) => {
            warn!(error = %err, "Failed to open journal candidate");
            return Owner::Other;
        }
    };

    for line in BufReader::new(file).lines() {
        let Ok(line) = line else {
            return Owner::Other;
        };
        match Record::parse_line(&line) {
            Some(Record::Fileheader(header)) => {
                if variant.is_some_and(|v| v != header.odyssey) {
                    return Owner::Other;
                }
            }
            Some(Record::Commander(commander)) => {
                return if commander.name.eq_ignore_ascii_case(identity) {
                    Owner::Matches
                } else {
                    Owner::Other
                };
            }
            _ => {}
        }
    }
    Owner::Undecided
}

/// Iterator over predecessor files. Each file is opened when it is reached,
/// never before.
pub struct JournalChain<'a> {
    navigator: &'a ChainNavigator,
    operator: Option<String>,
    variant: Option<bool>,
    before: DateTime<Utc>,
    done: bool,
}

impl Iterator for JournalChain<'_> {
    type Item = Result<JournalFile>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let path = match self.navigator.find_predecessor(
            self.operator.as_deref(),
            self.variant,
            self.before,
        ) {
            Ok(Some(path)) => path,
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };

        match JournalFile::open(&path) {
            Ok(file) => {
                if file.last_write() >= self.before {
                    // Rewritten while we were walking; stop rather than loop.
                    self.done = true;
                    return None;
                }
                self.before = file.last_write();
                if self.operator.is_none() {
                    self.operator = file.operator().map(str::to_string);
                }
                Some(Ok(file))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
