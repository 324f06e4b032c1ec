//! # survey-core
//!
//! Journal state engine: reconstructs what the commander is doing right now
//! (activity mode, system, nearby body, touchdown point, bookmarks) from the
//! game's append-only journal files plus its rewritten telemetry snapshots.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. Watchers and workers are plain threads
//!   that only feed an `mpsc` queue; one thread owns the [`StateEngine`].
//! - **Graceful degradation**: Malformed lines, half-written snapshots and
//!   failed saves are logged and skipped, never fatal.
//! - **Context, not globals**: Paths, settings, process probe and stores are
//!   bundled in a [`SurveyContext`] passed to the engine.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use survey_core::{Settings, StateEngine, StorageConfig, SurveyContext};
//!
//! let storage = StorageConfig::default();
//! let settings = Settings::load_or_default(&storage.settings_file());
//! let mut engine = StateEngine::new(SurveyContext::new(settings, storage), None, None)?;
//! println!("{}", engine.mode());
//! ```

pub mod annotations;
pub mod bookmarks;
pub mod commander;
pub mod context;
pub mod engine;
pub mod enrichment;
pub mod error;
pub mod geo;
pub mod journal;
pub mod mode;
pub mod process;
pub mod settings;
pub mod storage;
pub mod telemetry;
pub mod watch;

pub use annotations::{AnnotationStore, BodyRecord, JsonAnnotationStore, SystemRecord};
pub use bookmarks::BookmarkOutcome;
pub use commander::CommanderState;
pub use context::SurveyContext;
pub use engine::{
    BodyInfo, Control, EngineEvent, EngineInput, EngineSnapshot, Identity, LocationInfo,
    StateEngine,
};
pub use enrichment::{DirectoryEnrichment, EnrichmentProvider, SystemEnrichment};
pub use error::{Result, SurveyError};
pub use geo::LatLong;
pub use journal::{ChainNavigator, JournalFile, LiveJournal, Record, SearchOutcome};
pub use mode::Mode;
pub use process::{ProcessProbe, StaticProbe, SysinfoProbe};
pub use settings::Settings;
pub use storage::StorageConfig;
pub use telemetry::{NavRoute, Status, Vehicle};
