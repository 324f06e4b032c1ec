//! Journal files: typed records, historical files, the predecessor chain,
//! scanning, and the live tail.

pub mod chain;
pub mod file;
pub mod record;
pub mod scan;
pub mod tail;

pub use chain::{ChainNavigator, JournalChain};
pub use file::JournalFile;
pub use record::{Record, RecordKind};
pub use scan::{Direction, ScanFrom, SearchOutcome, Visit};
pub use tail::LiveJournal;
