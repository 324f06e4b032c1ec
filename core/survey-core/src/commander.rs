//! The per-commander slice of derived state, persisted by FID.

use serde::{Deserialize, Serialize};

use crate::journal::record::{Record, ScanType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedOrganic {
    pub system_address: u64,
    pub body_id: u32,
    pub genus: String,
    pub species: String,
}

/// An organic scan that has been started but not yet analysed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub system_address: u64,
    pub body_id: u32,
    pub genus: String,
    pub species: String,
    /// Log and Sample steps taken so far.
    pub samples: u8,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommanderState {
    pub fid: String,
    pub name: String,
    pub current_system: String,
    pub current_system_address: u64,
    pub star_pos: [f64; 3],
    pub current_body: Option<String>,
    pub current_body_id: Option<u32>,
    pub current_body_radius: Option<f64>,
    /// Human-readable "system, body" of the last known location.
    pub last_location: String,
    pub suit: Option<String>,
    pub scan_progress: Option<ScanProgress>,
    /// Analysed organics not yet sold.
    pub scanned_organics: Vec<ScannedOrganic>,
}

impl CommanderState {
    pub fn new(fid: &str, name: &str) -> Self {
        Self {
            fid: fid.to_string(),
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn set_location(&mut self, system: &str, address: u64, star_pos: [f64; 3]) {
        self.current_system = system.to_string();
        self.current_system_address = address;
        self.star_pos = star_pos;
        self.refresh_last_location();
    }

    pub fn set_body(&mut self, body: Option<(&str, u32, Option<f64>)>) {
        match body {
            Some((name, id, radius)) => {
                self.current_body = Some(name.to_string());
                self.current_body_id = Some(id);
                self.current_body_radius = radius;
            }
            None => {
                self.current_body = None;
                self.current_body_id = None;
                self.current_body_radius = None;
            }
        }
        self.refresh_last_location();
    }

    fn refresh_last_location(&mut self) {
        self.last_location = match &self.current_body {
            Some(body) => format!("{}, {}", self.current_system, body),
            None => self.current_system.clone(),
        };
    }

    /// Folds the commander-level records. Returns true if anything changed.
    pub fn apply(&mut self, record: &Record) -> bool {
        match record {
            Record::SuitLoadout(entry) => {
                self.suit = Some(entry.suit_name.clone());
                true
            }
            Record::SwitchSuitLoadout(entry) => {
                self.suit = Some(entry.suit_name.clone());
                true
            }
            Record::ScanOrganic(entry) => {
                match entry.scan_type {
                    ScanType::Log => {
                        self.scan_progress = Some(ScanProgress {
                            system_address: entry.system_address,
                            body_id: entry.body_id,
                            genus: entry.genus.clone(),
                            species: entry.species.clone(),
                            samples: 1,
                        });
                    }
                    ScanType::Sample => {
                        let progress = self.scan_progress.get_or_insert_with(|| ScanProgress {
                            system_address: entry.system_address,
                            body_id: entry.body_id,
                            genus: entry.genus.clone(),
                            species: entry.species.clone(),
                            samples: 0,
                        });
                        progress.samples = progress.samples.saturating_add(1);
                    }
                    ScanType::Analyse => {
                        self.scan_progress = None;
                        let organic = ScannedOrganic {
                            system_address: entry.system_address,
                            body_id: entry.body_id,
                            genus: entry.genus.clone(),
                            species: entry.species.clone(),
                        };
                        if !self.scanned_organics.contains(&organic) {
                            self.scanned_organics.push(organic);
                        }
                    }
                }
                true
            }
            Record::SellOrganicData(entry) => {
                let before = self.scanned_organics.len();
                for sale in &entry.bio_data {
                    if let Some(index) = self
                        .scanned_organics
                        .iter()
                        .position(|organic| organic.species == sale.species)
                    {
                        self.scanned_organics.remove(index);
                    }
                }
                self.scanned_organics.len() != before
            }
            Record::Died(_) => {
                let changed = !self.scanned_organics.is_empty() || self.scan_progress.is_some();
                self.scanned_organics.clear();
                self.scan_progress = None;
                changed
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn organic(scan_type: &str, species: &str) -> Record {
        Record::parse_line(&format!(
            r#"{{ "timestamp":"2024-03-01T10:00:00Z", "event":"ScanOrganic", "ScanType":"{}", "Genus":"$G;", "Species":"{}", "SystemAddress":10, "Body":3 }}"#,
            scan_type, species
        ))
        .expect("scan parses")
    }

    #[test]
    fn organic_scans_progress_then_sell() {
        let mut cmdr = CommanderState::new("F1", "CMDR1");
        cmdr.apply(&organic("Log", "$S1;"));
        cmdr.apply(&organic("Sample", "$S1;"));
        assert_eq!(cmdr.scan_progress.as_ref().map(|p| p.samples), Some(2));

        cmdr.apply(&organic("Analyse", "$S1;"));
        assert!(cmdr.scan_progress.is_none());
        assert_eq!(cmdr.scanned_organics.len(), 1);

        let sale = Record::parse_line(
            r#"{ "timestamp":"2024-03-01T11:00:00Z", "event":"SellOrganicData", "MarketID":1, "BioData":[{ "Genus":"$G;", "Species":"$S1;", "Value":1000, "Bonus":0 }] }"#,
        )
        .expect("sale parses");
        assert!(cmdr.apply(&sale));
        assert!(cmdr.scanned_organics.is_empty());
    }

    #[test]
    fn death_forfeits_unsold_organics() {
        let mut cmdr = CommanderState::new("F1", "CMDR1");
        cmdr.apply(&organic("Analyse", "$S1;"));
        let died = Record::parse_line(r#"{ "timestamp":"2024-03-01T11:00:00Z", "event":"Died" }"#)
            .expect("died parses");
        assert!(cmdr.apply(&died));
        assert!(cmdr.scanned_organics.is_empty());
    }

    #[test]
    fn last_location_tracks_body() {
        let mut cmdr = CommanderState::new("F1", "CMDR1");
        cmdr.set_location("Sol", 10, [0.0, 0.0, 0.0]);
        cmdr.set_body(Some(("Earth", 3, Some(6371000.0))));
        assert_eq!(cmdr.last_location, "Sol, Earth");
        cmdr.set_body(None);
        assert_eq!(cmdr.last_location, "Sol");
    }
}
