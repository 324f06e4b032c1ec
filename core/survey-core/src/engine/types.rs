//! Values crossing the engine boundary: inputs, notifications, snapshots.

use serde::Serialize;
use std::path::PathBuf;

use crate::enrichment::SystemEnrichment;
use crate::geo::LatLong;
use crate::mode::Mode;
use crate::telemetry::{NavRoute, Status, Vehicle};

/// Everything the engine thread consumes, in arrival order.
#[derive(Debug)]
#[allow(clippy::large_enum_variant)]
pub enum EngineInput {
    /// The live journal was written to.
    JournalChanged,
    /// The game started a new journal file.
    JournalCreated(PathBuf),
    Telemetry(Status),
    Route(NavRoute),
    ProcessTick,
    Enrichment {
        system: String,
        result: std::result::Result<SystemEnrichment, String>,
    },
}

/// What the owner of the engine should do after an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    Continue,
    /// Tear this engine down and build a fresh one. Carries the new journal
    /// when one was created; `None` means find the newest again (the game
    /// came back after stopping).
    Rebuild(Option<PathBuf>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyInfo {
    pub system: String,
    pub system_address: u64,
    pub name: String,
    pub id: u32,
    /// Meters.
    pub radius: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationInfo {
    pub system: String,
    pub address: u64,
    pub star_pos: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub name: String,
    pub fid: String,
    pub odyssey: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    ModeChanged { mode: Mode, forced: bool },
    NearingBody(BodyInfo),
    DepartingBody(BodyInfo),
}

/// Point-in-time copy of derived state, for display or `status` output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub functional: bool,
    pub commander: Option<Identity>,
    pub mode: Mode,
    pub vehicle: Option<Vehicle>,
    pub suit: Option<String>,
    pub location: Option<LocationInfo>,
    pub body: Option<BodyInfo>,
    pub touchdown: Option<LatLong>,
    pub next_system: Option<String>,
    pub unsold_organics: usize,
    pub enrichment: Option<SystemEnrichment>,
}
