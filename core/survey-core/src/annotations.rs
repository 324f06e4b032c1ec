//! Per-system annotations and their persistence.
//!
//! A [`SystemRecord`] is built up from journal records while we are in a
//! system (bodies, radii, signals, organics, touchdowns) and carries the
//! user's bookmarks. One JSON file per system address lives under
//! `~/.survey/systems/`; commander slices live under `~/.survey/commanders/`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::commander::CommanderState;
use crate::error::{Result, SurveyError};
use crate::geo::LatLong;
use crate::journal::record::{Record, ScanType, SIGNAL_TYPE_BIOLOGICAL};
use crate::storage::StorageConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganismRecord {
    pub genus: String,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub analysed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyRecord {
    pub name: String,
    pub id: u32,
    /// Meters.
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmarks: Option<BTreeMap<String, Vec<LatLong>>>,
    #[serde(default)]
    pub bio_signal_count: u32,
    #[serde(default)]
    pub organisms: Vec<OrganismRecord>,
    #[serde(default)]
    pub surface_mapped: bool,
    #[serde(default)]
    pub last_touchdown: Option<LatLong>,
}

impl BodyRecord {
    pub fn new(name: &str, id: u32) -> Self {
        Self {
            name: name.to_string(),
            id,
            radius: None,
            bookmarks: None,
            bio_signal_count: 0,
            organisms: Vec::new(),
            surface_mapped: false,
            last_touchdown: None,
        }
    }

    fn organism_mut(&mut self, genus: &str) -> &mut OrganismRecord {
        let index = match self.organisms.iter().position(|o| o.genus == genus) {
            Some(index) => index,
            None => {
                self.organisms.push(OrganismRecord {
                    genus: genus.to_string(),
                    species: None,
                    analysed: false,
                });
                self.organisms.len() - 1
            }
        };
        &mut self.organisms[index]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemRecord {
    pub name: String,
    pub address: u64,
    #[serde(default)]
    pub star_pos: [f64; 3],
    #[serde(default)]
    pub body_count: Option<u32>,
    #[serde(default)]
    pub bodies: Vec<BodyRecord>,
}

impl SystemRecord {
    pub fn new(name: &str, address: u64, star_pos: [f64; 3]) -> Self {
        Self {
            name: name.to_string(),
            address,
            star_pos,
            body_count: None,
            bodies: Vec::new(),
        }
    }

    pub fn body(&self, name: &str) -> Option<&BodyRecord> {
        self.bodies.iter().find(|body| body.name == name)
    }

    pub fn body_mut(&mut self, name: &str) -> Option<&mut BodyRecord> {
        self.bodies.iter_mut().find(|body| body.name == name)
    }

    /// Returns the body named `name`, creating it if needed.
    pub fn body_entry(&mut self, name: &str, id: u32) -> &mut BodyRecord {
        let index = match self.bodies.iter().position(|body| body.name == name) {
            Some(index) => index,
            None => {
                self.bodies.push(BodyRecord::new(name, id));
                self.bodies.len() - 1
            }
        };
        &mut self.bodies[index]
    }

    fn body_by_id_mut(&mut self, id: u32) -> Option<&mut BodyRecord> {
        self.bodies.iter_mut().find(|body| body.id == id)
    }

    /// Folds one record into the annotations. Records from other systems are
    /// ignored. Returns true if anything changed.
    pub fn apply(&mut self, record: &Record) -> bool {
        if record.system_address().is_some_and(|address| address != self.address) {
            return false;
        }

        match record {
            Record::FssDiscoveryScan(entry) => {
                self.body_count = Some(entry.body_count);
                true
            }
            Record::Scan(entry) => {
                let body = self.body_entry(&entry.body_name, entry.body_id);
                body.id = entry.body_id;
                if entry.radius.is_some() {
                    body.radius = entry.radius;
                }
                true
            }
            Record::ApproachBody(entry) => {
                self.body_entry(&entry.body, entry.body_id);
                true
            }
            Record::SaaScanComplete(entry) => {
                self.body_entry(&entry.body_name, entry.body_id).surface_mapped = true;
                true
            }
            Record::SaaSignalsFound(entry) => {
                let body = self.body_entry(&entry.body_name, entry.body_id);
                if let Some(bio) = entry
                    .signals
                    .iter()
                    .find(|signal| signal.signal_type == SIGNAL_TYPE_BIOLOGICAL)
                {
                    body.bio_signal_count = bio.count;
                }
                for genus in &entry.genuses {
                    body.organism_mut(&genus.genus);
                }
                true
            }
            Record::Touchdown(entry) => {
                self.body_entry(&entry.body, entry.body_id).last_touchdown = Some(entry.lat_long());
                true
            }
            Record::ScanOrganic(entry) => {
                let Some(body) = self.body_by_id_mut(entry.body_id) else {
                    debug!(body_id = entry.body_id, "Organic scan on unknown body");
                    return false;
                };
                let organism = body.organism_mut(&entry.genus);
                organism.species = Some(entry.species.clone());
                if entry.scan_type == ScanType::Analyse {
                    organism.analysed = true;
                }
                true
            }
            _ => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Persistence
// ─────────────────────────────────────────────────────────────────────────────

/// Load/save of per-system and per-commander slices.
///
/// A failed save leaves the caller's in-memory copy authoritative.
pub trait AnnotationStore: Send + Sync {
    fn load_system(&self, address: u64) -> Result<Option<SystemRecord>>;
    fn save_system(&self, record: &SystemRecord) -> Result<()>;
    fn load_commander(&self, fid: &str) -> Result<Option<CommanderState>>;
    fn save_commander(&self, state: &CommanderState) -> Result<()>;
}

/// JSON files under the storage root, written atomically.
pub struct JsonAnnotationStore {
    storage: StorageConfig,
}

impl JsonAnnotationStore {
    pub fn new(storage: StorageConfig) -> Self {
        Self { storage }
    }
}

impl AnnotationStore for JsonAnnotationStore {
    fn load_system(&self, address: u64) -> Result<Option<SystemRecord>> {
        load_json(&self.storage.system_file(address))
    }

    fn save_system(&self, record: &SystemRecord) -> Result<()> {
        save_json_with_retry(&self.storage.system_file(record.address), record)
    }

    fn load_commander(&self, fid: &str) -> Result<Option<CommanderState>> {
        load_json(&self.storage.commander_file(fid))
    }

    fn save_commander(&self, state: &CommanderState) -> Result<()> {
        save_json_with_retry(&self.storage.commander_file(&state.fid), state)
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs_err::read_to_string(path)
        .map_err(|err| SurveyError::io("Failed to read annotations", err))?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|err| SurveyError::json(format!("Failed to parse {}", path.display()), err))
}

fn save_json_with_retry<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    match save_json(path, value) {
        Ok(()) => Ok(()),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Save failed; retrying once");
            save_json(path, value)
        }
    }
}

/// Temp file in the target directory, then rename over the target.
fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs_err::create_dir_all(dir)
        .map_err(|err| SurveyError::io("Failed to create annotations dir", err))?;

    let content = serde_json::to_string_pretty(value)
        .map_err(|err| SurveyError::json("Failed to serialize annotations", err))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|err| SurveyError::Io {
        context: format!("creating temp file in {}", dir.display()),
        source: err,
    })?;
    tmp.write_all(content.as_bytes())
        .map_err(|err| SurveyError::io("Failed to write temp file", err))?;
    tmp.flush()
        .map_err(|err| SurveyError::io("Failed to flush temp file", err))?;
    tmp.persist(path).map_err(|err| SurveyError::Io {
        context: format!("persisting temp file to {}", path.display()),
        source: err.error,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line: &str) -> Record {
        Record::parse_line(line).expect("record parses")
    }

    #[test]
    fn apply_builds_bodies_from_exploration_records() {
        let mut system = SystemRecord::new("Sol", 10, [0.0, 0.0, 0.0]);
        assert!(system.apply(&record(
            r#"{ "timestamp":"2024-03-01T10:00:00Z", "event":"Scan", "SystemAddress":10, "BodyName":"Earth", "BodyID":3, "Radius":6371000.0 }"#
        )));
        assert!(system.apply(&record(
            r#"{ "timestamp":"2024-03-01T10:01:00Z", "event":"SAASignalsFound", "SystemAddress":10, "BodyName":"Earth", "BodyID":3,
                "Signals":[{ "Type":"$SAA_SignalType_Biological;", "Count":2 }],
                "Genuses":[{ "Genus":"$Codex_Ent_Bacterial_Genus_Name;" }] }"#
        )));
        assert!(system.apply(&record(
            r#"{ "timestamp":"2024-03-01T10:02:00Z", "event":"ScanOrganic", "ScanType":"Analyse", "Genus":"$Codex_Ent_Bacterial_Genus_Name;", "Species":"$Codex_Ent_Bacterial_01_Name;", "SystemAddress":10, "Body":3 }"#
        )));

        let earth = system.body("Earth").expect("earth recorded");
        assert_eq!(earth.radius, Some(6371000.0));
        assert_eq!(earth.bio_signal_count, 2);
        assert_eq!(earth.organisms.len(), 1);
        assert!(earth.organisms[0].analysed);
    }

    #[test]
    fn apply_ignores_other_systems() {
        let mut system = SystemRecord::new("Sol", 10, [0.0, 0.0, 0.0]);
        assert!(!system.apply(&record(
            r#"{ "timestamp":"2024-03-01T10:00:00Z", "event":"Scan", "SystemAddress":11, "BodyName":"Elsewhere", "BodyID":1 }"#
        )));
        assert!(system.bodies.is_empty());
    }

    #[test]
    fn json_store_round_trips_through_disk() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let storage = StorageConfig::with_roots(
            temp_dir.path().join("data"),
            temp_dir.path().join("journals"),
        );
        let store = JsonAnnotationStore::new(storage.clone());

        assert!(store.load_system(10).expect("load missing").is_none());

        let mut system = SystemRecord::new("Sol", 10, [0.0, 0.0, 0.0]);
        system.body_entry("Earth", 3).radius = Some(6371000.0);
        store.save_system(&system).expect("save system");

        assert!(storage.system_file(10).exists());
        let loaded = store.load_system(10).expect("load").expect("present");
        assert_eq!(loaded, system);
    }

    #[test]
    fn corrupt_system_file_is_an_error() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let storage = StorageConfig::with_roots(temp_dir.path().to_path_buf(), temp_dir.path().to_path_buf());
        fs_err::create_dir_all(storage.systems_dir()).expect("systems dir");
        fs_err::write(storage.system_file(7), "{ nope").expect("write corrupt");

        let store = JsonAnnotationStore::new(storage);
        assert!(matches!(store.load_system(7), Err(SurveyError::Json { .. })));
    }
}
