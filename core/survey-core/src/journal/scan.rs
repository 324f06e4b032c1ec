//! Positional scans and typed searches over journal files.
//!
//! Everything here is a pure query: predicates and visitors return what they
//! found and the caller applies it afterwards.

use tracing::{debug, warn};

use super::chain::ChainNavigator;
use super::file::JournalFile;
use super::record::{Record, RecordKind};

/// Starting position for a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFrom {
    /// The newest record of the file.
    End,
    Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

/// Visitor verdict for [`JournalFile::walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    Stop,
}

/// Result of a search that may cross file boundaries.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome<T> {
    Found(T),
    /// Every reachable file was examined.
    Exhausted,
    /// The stop condition or the file-count cap ended the search early.
    Bounded,
}

impl<T> SearchOutcome<T> {
    pub fn found(self) -> Option<T> {
        match self {
            SearchOutcome::Found(value) => Some(value),
            _ => None,
        }
    }
}

impl JournalFile {
    /// Record indices from `from` towards the nearest end, inclusive.
    fn indices(&self, from: ScanFrom, direction: Direction) -> Box<dyn Iterator<Item = usize>> {
        let len = self.records.len();
        if len == 0 {
            return Box::new(std::iter::empty());
        }
        let start = match from {
            ScanFrom::End => len - 1,
            ScanFrom::Index(index) => index.min(len - 1),
        };
        match direction {
            Direction::Backward => Box::new((0..=start).rev()),
            Direction::Forward => Box::new(start..len),
        }
    }

    /// Index and value of the first record of kind `K` met scanning from `from`.
    pub fn find_index_of_kind<K: RecordKind>(
        &self,
        from: ScanFrom,
        direction: Direction,
    ) -> Option<(usize, &K)> {
        self.indices(from, direction)
            .find_map(|index| K::from_record(&self.records[index]).map(|found| (index, found)))
    }

    pub fn find_last_of_kind<K: RecordKind>(&self, from: ScanFrom, direction: Direction) -> Option<&K> {
        self.find_index_of_kind(from, direction).map(|(_, found)| found)
    }

    /// Searches backward from the end; the first `Some` the predicate returns wins.
    pub fn search<K, T, F>(&self, mut predicate: F) -> Option<T>
    where
        K: RecordKind,
        F: FnMut(&K) -> Option<T>,
    {
        self.records
            .iter()
            .rev()
            .filter_map(K::from_record)
            .find_map(|record| predicate(record))
    }

    /// Like [`JournalFile::search`], continuing into predecessor files.
    ///
    /// After a file is exhausted, `stop` is asked about that file; `true`
    /// ends the search as [`SearchOutcome::Bounded`]. The navigator's
    /// file-count cap bounds it the same way.
    pub fn search_deep<K, T, F, S>(
        &self,
        navigator: &ChainNavigator,
        mut predicate: F,
        mut stop: S,
    ) -> SearchOutcome<T>
    where
        K: RecordKind,
        F: FnMut(&K) -> Option<T>,
        S: FnMut(&JournalFile) -> bool,
    {
        if let Some(found) = self.search::<K, T, _>(&mut predicate) {
            return SearchOutcome::Found(found);
        }
        if stop(self) {
            return SearchOutcome::Bounded;
        }

        let mut chain = navigator.chain_from(self);
        let mut opened = 0;
        loop {
            if opened >= navigator.max_files() {
                debug!(opened, "Deep search hit file cap");
                return SearchOutcome::Bounded;
            }
            let file = match chain.next() {
                Some(Ok(file)) => file,
                Some(Err(err)) => {
                    warn!(error = %err, "Deep search could not open predecessor");
                    return SearchOutcome::Exhausted;
                }
                None => return SearchOutcome::Exhausted,
            };
            opened += 1;

            if let Some(found) = file.search::<K, T, _>(&mut predicate) {
                return SearchOutcome::Found(found);
            }
            if stop(&file) {
                return SearchOutcome::Bounded;
            }
        }
    }

    /// Visits records from `from` to the nearest end inclusive. Returns true
    /// if the visitor stopped the walk.
    pub fn walk<F>(&self, from: ScanFrom, direction: Direction, mut visitor: F) -> bool
    where
        F: FnMut(usize, &Record) -> Visit,
    {
        for index in self.indices(from, direction) {
            if visitor(index, &self.records[index]) == Visit::Stop {
                return true;
            }
        }
        false
    }

    /// Backward walk over this file and then its predecessors, newest first.
    pub fn walk_deep<F>(&self, navigator: &ChainNavigator, mut visitor: F) -> SearchOutcome<()>
    where
        F: FnMut(&Record) -> Visit,
    {
        if self.walk(ScanFrom::End, Direction::Backward, |_, record| visitor(record)) {
            return SearchOutcome::Found(());
        }

        let mut chain = navigator.chain_from(self);
        let mut opened = 0;
        loop {
            if opened >= navigator.max_files() {
                debug!(opened, "Deep walk hit file cap");
                return SearchOutcome::Bounded;
            }
            match chain.next() {
                Some(Ok(file)) => {
                    opened += 1;
                    if file.walk(ScanFrom::End, Direction::Backward, |_, record| visitor(record)) {
                        return SearchOutcome::Found(());
                    }
                }
                Some(Err(err)) => {
                    warn!(error = %err, "Deep walk could not open predecessor");
                    return SearchOutcome::Exhausted;
                }
                None => return SearchOutcome::Exhausted,
            }
        }
    }
}
