//! Incremental tail of the active journal file.
//!
//! The game appends to the live journal while we hold it open. Each poll
//! reads only the bytes appended since the last complete line; a trailing
//! partial line stays unconsumed until its newline arrives, so records are
//! never delivered twice or skipped no matter how writes are split.

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, warn};

use super::file::{last_write_time, JournalFile};
use super::record::Record;
use crate::error::{Result, SurveyError};

pub struct LiveJournal {
    journal: JournalFile,
    handle: fs_err::File,
    /// Byte offset just past the last complete line consumed.
    cursor: u64,
}

impl LiveJournal {
    /// Opens `path` and consumes everything already written.
    pub fn open(path: &Path) -> Result<LiveJournal> {
        let handle = fs_err::File::open(path)
            .map_err(|err| SurveyError::io("Failed to open live journal", err))?;
        let last_write = last_write_time(path)?;

        let mut live = LiveJournal {
            journal: JournalFile::from_records(path.to_path_buf(), last_write, Vec::new()),
            handle,
            cursor: 0,
        };
        let initial = live.poll(|_, _| {})?;
        debug!(path = %path.display(), records = initial, "Opened live journal");
        Ok(live)
    }

    pub fn journal(&self) -> &JournalFile {
        &self.journal
    }

    pub fn path(&self) -> &Path {
        self.journal.path()
    }

    /// Reads newly appended lines, calling `on_record` for each parsed record
    /// with its index in the file. Returns how many records were appended.
    pub fn poll<F>(&mut self, mut on_record: F) -> Result<usize>
    where
        F: FnMut(&Record, usize),
    {
        let file_len = self
            .handle
            .metadata()
            .map_err(|err| SurveyError::io("Failed to stat live journal", err))?
            .len();

        if file_len < self.cursor {
            warn!(
                path = %self.journal.path().display(),
                old_offset = self.cursor,
                file_len,
                "Live journal shrank; re-reading from start"
            );
            self.cursor = 0;
            self.journal.records.clear();
        }
        if file_len == self.cursor {
            return Ok(0);
        }

        self.handle
            .seek(SeekFrom::Start(self.cursor))
            .map_err(|err| SurveyError::io("Failed to seek live journal", err))?;
        let mut buf = Vec::with_capacity((file_len - self.cursor) as usize);
        (&mut self.handle)
            .take(file_len - self.cursor)
            .read_to_end(&mut buf)
            .map_err(|err| SurveyError::io("Failed to read live journal", err))?;

        let Some(last_newline) = buf.iter().rposition(|&b| b == b'\n') else {
            return Ok(0);
        };
        self.cursor += last_newline as u64 + 1;

        let mut appended = 0;
        for line in buf[..=last_newline].split(|&b| b == b'\n') {
            let text = String::from_utf8_lossy(line);
            let Some(record) = Record::parse_line(&text) else {
                continue;
            };
            let index = self.journal.records.len();
            self.journal.records.push(record);
            on_record(&self.journal.records[index], index);
            appended += 1;
        }

        if appended > 0 {
            if let Ok(written) = last_write_time(self.journal.path()) {
                self.journal.last_write = written;
            }
            self.journal.refresh_identity();
        }
        Ok(appended)
    }
}
