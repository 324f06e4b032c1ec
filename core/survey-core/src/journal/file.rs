//! One physical journal file, fully parsed into memory.
//!
//! Historical files are opened for a single search step and dropped
//! afterwards; the live file is wrapped by [`super::tail::LiveJournal`].

use chrono::{DateTime, Utc};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::record::{Commander, Fileheader, Record};
use super::scan::{Direction, ScanFrom};
use crate::error::{Result, SurveyError};

#[derive(Debug, Clone)]
pub struct JournalFile {
    pub(crate) path: PathBuf,
    pub(crate) last_write: DateTime<Utc>,
    pub(crate) records: Vec<Record>,
    pub(crate) operator: Option<String>,
    pub(crate) odyssey: bool,
}

impl JournalFile {
    /// Reads and parses every line of `path`.
    ///
    /// The game keeps the active journal open for writing; plain read access
    /// is shared on every platform std supports, so the writer is never blocked.
    pub fn open(path: &Path) -> Result<JournalFile> {
        debug!(path = %path.display(), "Reading journal");
        let last_write = last_write_time(path)?;
        let file = fs_err::File::open(path)
            .map_err(|err| SurveyError::io("Failed to open journal", err))?;

        let mut records = Vec::new();
        let mut reader = BufReader::new(file);
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            let read = reader
                .read_until(b'\n', &mut buffer)
                .map_err(|err| SurveyError::io("Failed to read journal", err))?;
            if read == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buffer);
            if let Some(record) = Record::parse_line(&line) {
                records.push(record);
            }
        }

        Ok(JournalFile::from_records(path.to_path_buf(), last_write, records))
    }

    /// Builds a file from already-parsed records, resolving identity/variant.
    pub fn from_records(path: PathBuf, last_write: DateTime<Utc>, records: Vec<Record>) -> Self {
        let mut file = JournalFile {
            path,
            last_write,
            records,
            operator: None,
            odyssey: false,
        };
        file.refresh_identity();
        file
    }

    /// Re-reads identity/variant from the leading records. The live file calls
    /// this after appends until both are known.
    pub(crate) fn refresh_identity(&mut self) {
        if self.operator.is_none() {
            self.operator = self
                .find_last_of_kind::<Commander>(ScanFrom::Index(0), Direction::Forward)
                .map(|entry| entry.name.clone());
        }
        if let Some(Record::Fileheader(Fileheader { odyssey, .. })) = self.records.first() {
            self.odyssey = *odyssey;
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_write(&self) -> DateTime<Utc> {
        self.last_write
    }

    pub fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    pub fn is_odyssey(&self) -> bool {
        self.odyssey
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub(crate) fn last_write_time(path: &Path) -> Result<DateTime<Utc>> {
    let modified = fs_err::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|err| SurveyError::io("Failed to read journal metadata", err))?;
    Ok(DateTime::<Utc>::from(modified))
}
