//! Typed journal records.
//!
//! Each journal line is a JSON object with an `event` discriminant and a
//! `timestamp`. Only the kinds the engine cares about have a variant here;
//! everything else fails to deserialize and is dropped by [`Record::parse_line`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::LatLong;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Record {
    Fileheader(Fileheader),
    Commander(Commander),
    LoadGame(LoadGame),
    Shutdown(Shutdown),
    Music(Music),
    Location(Location),
    #[serde(rename = "FSDJump")]
    FsdJump(FsdJump),
    CarrierJump(CarrierJump),
    StartJump(StartJump),
    SupercruiseEntry(SupercruiseEntry),
    SupercruiseExit(SupercruiseExit),
    ApproachBody(ApproachBody),
    LeaveBody(LeaveBody),
    ApproachSettlement(ApproachSettlement),
    Scan(Scan),
    #[serde(rename = "FSSDiscoveryScan")]
    FssDiscoveryScan(FssDiscoveryScan),
    #[serde(rename = "SAAScanComplete")]
    SaaScanComplete(SaaScanComplete),
    #[serde(rename = "SAASignalsFound")]
    SaaSignalsFound(SaaSignalsFound),
    Touchdown(Touchdown),
    Liftoff(Liftoff),
    ScanOrganic(ScanOrganic),
    SellOrganicData(SellOrganicData),
    SuitLoadout(SuitLoadout),
    SwitchSuitLoadout(SwitchSuitLoadout),
    Died(Died),
}

impl Record {
    /// Parses one journal line. Blank lines, malformed JSON and unknown
    /// event kinds all yield `None`.
    pub fn parse_line(line: &str) -> Option<Record> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str::<Record>(trimmed) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::trace!(error = %err, "Skipping journal line");
                None
            }
        }
    }

    /// System address carried by this record, if any.
    pub fn system_address(&self) -> Option<u64> {
        match self {
            Record::Location(e) => Some(e.system_address),
            Record::FsdJump(e) => Some(e.system_address),
            Record::CarrierJump(e) => Some(e.system_address),
            Record::SupercruiseEntry(e) => Some(e.system_address),
            Record::SupercruiseExit(e) => Some(e.system_address),
            Record::ApproachBody(e) => Some(e.system_address),
            Record::LeaveBody(e) => Some(e.system_address),
            Record::ApproachSettlement(e) => Some(e.system_address),
            Record::Scan(e) => Some(e.system_address),
            Record::FssDiscoveryScan(e) => Some(e.system_address),
            Record::SaaScanComplete(e) => Some(e.system_address),
            Record::SaaSignalsFound(e) => Some(e.system_address),
            Record::Touchdown(e) => Some(e.system_address),
            Record::Liftoff(e) => Some(e.system_address),
            Record::ScanOrganic(e) => Some(e.system_address),
            _ => None,
        }
    }

    /// True for records that move us into a (possibly) different system.
    pub fn is_location_arrival(&self) -> bool {
        matches!(
            self,
            Record::Location(_) | Record::FsdJump(_) | Record::CarrierJump(_)
        )
    }
}

/// Typed access to one record kind, used by the scanner.
pub trait RecordKind: Sized {
    fn from_record(record: &Record) -> Option<&Self>;
}

macro_rules! record_kinds {
    ($($variant:ident => $name:literal),* $(,)?) => {
        $(
            impl RecordKind for $variant {
                fn from_record(record: &Record) -> Option<&Self> {
                    match record {
                        Record::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*

        impl Record {
            /// Journal event name of this record.
            pub fn kind(&self) -> &'static str {
                match self {
                    $(Record::$variant(_) => $name,)*
                }
            }

            pub fn timestamp(&self) -> DateTime<Utc> {
                match self {
                    $(Record::$variant(inner) => inner.timestamp,)*
                }
            }
        }
    };
}

record_kinds! {
    Fileheader => "Fileheader",
    Commander => "Commander",
    LoadGame => "LoadGame",
    Shutdown => "Shutdown",
    Music => "Music",
    Location => "Location",
    FsdJump => "FSDJump",
    CarrierJump => "CarrierJump",
    StartJump => "StartJump",
    SupercruiseEntry => "SupercruiseEntry",
    SupercruiseExit => "SupercruiseExit",
    ApproachBody => "ApproachBody",
    LeaveBody => "LeaveBody",
    ApproachSettlement => "ApproachSettlement",
    Scan => "Scan",
    FssDiscoveryScan => "FSSDiscoveryScan",
    SaaScanComplete => "SAAScanComplete",
    SaaSignalsFound => "SAASignalsFound",
    Touchdown => "Touchdown",
    Liftoff => "Liftoff",
    ScanOrganic => "ScanOrganic",
    SellOrganicData => "SellOrganicData",
    SuitLoadout => "SuitLoadout",
    SwitchSuitLoadout => "SwitchSuitLoadout",
    Died => "Died",
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fileheader {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub part: u32,
    #[serde(rename = "Odyssey", default)]
    pub odyssey: bool,
    #[serde(rename = "gameversion", default)]
    pub game_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commander {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "FID", default)]
    pub fid: String,
    #[serde(rename = "Name")]
    pub name: String,
}

/// Session start: the game has loaded a commander.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoadGame {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub commander: String,
    #[serde(rename = "FID", default)]
    pub fid: String,
    #[serde(default)]
    pub odyssey: Option<bool>,
    #[serde(default)]
    pub ship: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shutdown {
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Music {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub music_track: String,
}

pub const MUSIC_MAIN_MENU: &str = "MainMenu";
pub const MUSIC_CARRIER_MANAGEMENT: &str = "FleetCarrier_Managment";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Died {
    pub timestamp: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Travel
// ─────────────────────────────────────────────────────────────────────────────

pub const BODY_TYPE_PLANET: &str = "Planet";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Location {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub star_system: String,
    pub system_address: u64,
    #[serde(default)]
    pub star_pos: [f64; 3],
    #[serde(default)]
    pub body: String,
    #[serde(rename = "BodyID", default)]
    pub body_id: u32,
    #[serde(default)]
    pub body_type: String,
    #[serde(default)]
    pub docked: bool,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Location {
    pub fn lat_long(&self) -> Option<LatLong> {
        Some(LatLong::new(self.latitude?, self.longitude?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FsdJump {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub star_system: String,
    pub system_address: u64,
    #[serde(default)]
    pub star_pos: [f64; 3],
    #[serde(default)]
    pub body: String,
    #[serde(rename = "BodyID", default)]
    pub body_id: u32,
    #[serde(default)]
    pub body_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CarrierJump {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub star_system: String,
    pub system_address: u64,
    #[serde(default)]
    pub star_pos: [f64; 3],
    #[serde(default)]
    pub body: String,
    #[serde(rename = "BodyID", default)]
    pub body_id: u32,
    #[serde(default)]
    pub body_type: String,
    #[serde(default)]
    pub docked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartJump {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub jump_type: String,
    #[serde(default)]
    pub star_system: Option<String>,
    #[serde(default)]
    pub system_address: Option<u64>,
}

pub const JUMP_TYPE_HYPERSPACE: &str = "Hyperspace";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SupercruiseEntry {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub star_system: String,
    pub system_address: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SupercruiseExit {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    // The game spells this one "Starsystem".
    #[serde(alias = "Starsystem")]
    pub star_system: String,
    pub system_address: u64,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "BodyID", default)]
    pub body_id: u32,
    #[serde(default)]
    pub body_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApproachBody {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub star_system: String,
    pub system_address: u64,
    pub body: String,
    #[serde(rename = "BodyID", default)]
    pub body_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LeaveBody {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub star_system: String,
    pub system_address: u64,
    pub body: String,
    #[serde(rename = "BodyID", default)]
    pub body_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApproachSettlement {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub system_address: u64,
    #[serde(rename = "BodyID", default)]
    pub body_id: u32,
    pub body_name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Exploration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Scan {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub star_system: String,
    pub system_address: u64,
    pub body_name: String,
    #[serde(rename = "BodyID", default)]
    pub body_id: u32,
    /// Meters. Absent for belt clusters.
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub planet_class: Option<String>,
    #[serde(default)]
    pub landable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FssDiscoveryScan {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub system_address: u64,
    #[serde(default)]
    pub body_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaaScanComplete {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub body_name: String,
    pub system_address: u64,
    #[serde(rename = "BodyID", default)]
    pub body_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignalCount {
    #[serde(rename = "Type")]
    pub signal_type: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GenusEntry {
    pub genus: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaaSignalsFound {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub body_name: String,
    pub system_address: u64,
    #[serde(rename = "BodyID", default)]
    pub body_id: u32,
    #[serde(default)]
    pub signals: Vec<SignalCount>,
    #[serde(default)]
    pub genuses: Vec<GenusEntry>,
}

pub const SIGNAL_TYPE_BIOLOGICAL: &str = "$SAA_SignalType_Biological;";

// ─────────────────────────────────────────────────────────────────────────────
// Surface
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Touchdown {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub star_system: String,
    pub system_address: u64,
    pub body: String,
    #[serde(rename = "BodyID", default)]
    pub body_id: u32,
    pub latitude: f64,
    pub longitude: f64,
}

impl Touchdown {
    pub fn lat_long(&self) -> LatLong {
        LatLong::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Liftoff {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub star_system: String,
    #[serde(default)]
    pub system_address: u64,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "BodyID", default)]
    pub body_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanType {
    Log,
    Sample,
    Analyse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanOrganic {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub scan_type: ScanType,
    pub genus: String,
    pub species: String,
    pub system_address: u64,
    /// Body id (the game names this field just "Body").
    #[serde(rename = "Body")]
    pub body_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BioSale {
    #[serde(default)]
    pub genus: String,
    pub species: String,
    #[serde(default)]
    pub value: u64,
    #[serde(default)]
    pub bonus: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SellOrganicData {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub bio_data: Vec<BioSale>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SuitLoadout {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub suit_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SwitchSuitLoadout {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub suit_name: String,
}
