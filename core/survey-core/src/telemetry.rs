//! Telemetry snapshots: `Status.json` and `NavRoute.json`.
//!
//! The game rewrites both files in place, so a read can land mid-write and see
//! an empty or truncated document. [`read_snapshot`] retries those briefly and
//! otherwise reports "no snapshot" rather than an error.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, SurveyError};
use crate::geo::LatLong;

const SNAPSHOT_READ_ATTEMPTS: u32 = 3;
const SNAPSHOT_RETRY_DELAY: Duration = Duration::from_millis(25);

// ─────────────────────────────────────────────────────────────────────────────
// Flags
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusFlags(pub u32);

impl StatusFlags {
    pub const DOCKED: u32 = 1 << 0;
    pub const LANDED: u32 = 1 << 1;
    pub const SUPERCRUISE: u32 = 1 << 4;
    pub const HAS_LAT_LONG: u32 = 1 << 21;
    pub const IN_MAIN_SHIP: u32 = 1 << 24;
    pub const IN_FIGHTER: u32 = 1 << 25;
    pub const IN_SRV: u32 = 1 << 26;
    pub const FSD_JUMP: u32 = 1 << 30;

    pub fn has(self, flag: u32) -> bool {
        self.0 & flag != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusFlags2(pub u32);

impl StatusFlags2 {
    pub const ON_FOOT: u32 = 1 << 0;
    pub const IN_TAXI: u32 = 1 << 1;
    pub const ON_FOOT_IN_STATION: u32 = 1 << 3;
    pub const GLIDE_MODE: u32 = 1 << 12;
    pub const ON_FOOT_SOCIAL_SPACE: u32 = 1 << 14;
    pub const ON_FOOT_EXTERIOR: u32 = 1 << 15;

    pub fn has(self, flag: u32) -> bool {
        self.0 & flag != 0
    }
}

/// Which in-game panel has focus. Anything but `NoFocus` overrides the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum GuiFocus {
    #[default]
    NoFocus,
    InternalPanel,
    ExternalPanel,
    CommsPanel,
    RolePanel,
    StationServices,
    GalaxyMap,
    SystemMap,
    Orrery,
    Fss,
    Saa,
    Codex,
    Other(u8),
}

impl From<u8> for GuiFocus {
    fn from(value: u8) -> Self {
        match value {
            0 => GuiFocus::NoFocus,
            1 => GuiFocus::InternalPanel,
            2 => GuiFocus::ExternalPanel,
            3 => GuiFocus::CommsPanel,
            4 => GuiFocus::RolePanel,
            5 => GuiFocus::StationServices,
            6 => GuiFocus::GalaxyMap,
            7 => GuiFocus::SystemMap,
            8 => GuiFocus::Orrery,
            9 => GuiFocus::Fss,
            10 => GuiFocus::Saa,
            11 => GuiFocus::Codex,
            other => GuiFocus::Other(other),
        }
    }
}

impl From<GuiFocus> for u8 {
    fn from(focus: GuiFocus) -> Self {
        match focus {
            GuiFocus::NoFocus => 0,
            GuiFocus::InternalPanel => 1,
            GuiFocus::ExternalPanel => 2,
            GuiFocus::CommsPanel => 3,
            GuiFocus::RolePanel => 4,
            GuiFocus::StationServices => 5,
            GuiFocus::GalaxyMap => 6,
            GuiFocus::SystemMap => 7,
            GuiFocus::Orrery => 8,
            GuiFocus::Fss => 9,
            GuiFocus::Saa => 10,
            GuiFocus::Codex => 11,
            GuiFocus::Other(other) => other,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshots
// ─────────────────────────────────────────────────────────────────────────────

/// The vehicle telemetry says we are in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vehicle {
    MainShip,
    Fighter,
    Srv,
    Foot,
    Taxi,
    Unknown,
}

/// One `Status.json` snapshot. At the main menu the game writes only the
/// timestamp, so everything else defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Status {
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub flags: StatusFlags,
    #[serde(default)]
    pub flags2: StatusFlags2,
    #[serde(default)]
    pub gui_focus: GuiFocus,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub body_name: Option<String>,
    /// Meters.
    #[serde(default)]
    pub planet_radius: Option<f64>,
}

impl Status {
    pub fn has_lat_long(&self) -> bool {
        self.flags.has(StatusFlags::HAS_LAT_LONG)
    }

    pub fn lat_long(&self) -> Option<LatLong> {
        if !self.has_lat_long() {
            return None;
        }
        Some(LatLong::new(self.latitude?, self.longitude?))
    }

    pub fn vehicle(&self) -> Vehicle {
        if self.flags.has(StatusFlags::IN_MAIN_SHIP) {
            Vehicle::MainShip
        } else if self.flags.has(StatusFlags::IN_FIGHTER) {
            Vehicle::Fighter
        } else if self.flags.has(StatusFlags::IN_SRV) {
            Vehicle::Srv
        } else if self.flags2.has(StatusFlags2::ON_FOOT) {
            Vehicle::Foot
        } else if self.flags2.has(StatusFlags2::IN_TAXI) {
            Vehicle::Taxi
        } else {
            Vehicle::Unknown
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteEntry {
    pub star_system: String,
    pub system_address: u64,
    #[serde(default)]
    pub star_pos: [f64; 3],
    #[serde(default)]
    pub star_class: String,
}

/// One `NavRoute.json` snapshot. The first hop is the system we plotted from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NavRoute {
    #[serde(default)]
    pub route: Vec<RouteEntry>,
}

impl NavRoute {
    /// The hop after `current_address`, or the first hop beyond the origin
    /// when we are not on the route.
    pub fn next_after(&self, current_address: Option<u64>) -> Option<&RouteEntry> {
        if let Some(address) = current_address {
            if let Some(position) = self
                .route
                .iter()
                .position(|hop| hop.system_address == address)
            {
                return self.route.get(position + 1);
            }
        }
        self.route.get(1)
    }
}

/// Reads a snapshot file that another process rewrites in place.
///
/// A missing file is `Ok(None)`. Empty or malformed content is retried a few
/// times and then also reported as `Ok(None)`.
pub fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    for attempt in 1..=SNAPSHOT_READ_ATTEMPTS {
        let content = match fs_err::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(SurveyError::io("Failed to read snapshot", err)),
        };

        if !content.trim().is_empty() {
            match serde_json::from_str::<T>(&content) {
                Ok(snapshot) => return Ok(Some(snapshot)),
                Err(err) => {
                    debug!(path = %path.display(), attempt, error = %err, "Snapshot not readable yet");
                }
            }
        }

        if attempt < SNAPSHOT_READ_ATTEMPTS {
            std::thread::sleep(SNAPSHOT_RETRY_DELAY);
        }
    }
    Ok(None)
}
