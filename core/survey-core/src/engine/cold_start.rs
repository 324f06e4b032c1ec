//! Reconstruction of derived state from journal history alone.
//!
//! Runs once, at construction, using only the scanner primitives. The order
//! matters: identity first (nothing else is meaningful without it), then the
//! system we are in, then the location within it, then the body and touchdown
//! that depend on telemetry.

use tracing::{debug, info, warn};

use super::body::arrival_bound;
use super::types::{Identity, LocationInfo};
use super::StateEngine;
use crate::annotations::SystemRecord;
use crate::commander::CommanderState;
use crate::error::Result;
use crate::journal::record::{
    LoadGame, Location, Music, Record, Scan, Shutdown, BODY_TYPE_PLANET,
};
use crate::journal::{Direction, ScanFrom, SearchOutcome, Visit};

impl StateEngine {
    pub(super) fn cold_start(&mut self) -> Result<()> {
        let Some(live) = self.journal.as_ref() else {
            return Ok(());
        };
        let journal = live.journal();

        let load = journal
            .find_index_of_kind::<LoadGame>(ScanFrom::End, Direction::Backward)
            .map(|(index, entry)| (index, entry.clone()));
        let shutdown_at = journal
            .find_index_of_kind::<Shutdown>(ScanFrom::End, Direction::Backward)
            .map(|(index, _)| index);
        let music = journal
            .find_last_of_kind::<Music>(ScanFrom::End, Direction::Backward)
            .cloned();

        if let Some((_, entry)) = &load {
            self.set_identity(entry);
        }

        if let Some(shutdown_at) = shutdown_at {
            if load.as_ref().map_or(true, |(load_at, _)| shutdown_at > *load_at) {
                info!("Journal ends with a Shutdown; game is not running this session");
                self.shutdown = true;
                return Ok(());
            }
        }

        if let Some(music) = music {
            self.apply_music(&music);
        }

        if self.identity.is_none() {
            info!("No session start in live journal yet");
            return Ok(());
        }

        self.init_system();
        self.restore_location();

        let status_body = self
            .status
            .as_ref()
            .filter(|status| status.has_lat_long())
            .and_then(|status| status.body_name.clone());
        if let Some(name) = status_body {
            self.materialize_body(&name)?;
        }

        if self.status_landed() {
            self.recover_touchdown();
        }

        info!(
            commander = ?self.identity.as_ref().map(|identity| &identity.name),
            system = ?self.location.as_ref().map(|location| &location.system),
            body = ?self.body.as_ref().map(|body| &body.name),
            touchdown = ?self.touchdown,
            "Cold start complete"
        );
        Ok(())
    }

    pub(super) fn set_identity(&mut self, entry: &LoadGame) {
        let odyssey = entry.odyssey.unwrap_or_else(|| {
            self.journal
                .as_ref()
                .map(|live| live.journal().is_odyssey())
                .unwrap_or(false)
        });
        info!(commander = %entry.commander, fid = %entry.fid, odyssey, "Commander identified");

        let mut commander = match self.context.store.load_commander(&entry.fid) {
            Ok(Some(state)) => state,
            Ok(None) => CommanderState::new(&entry.fid, &entry.commander),
            Err(err) => {
                warn!(error = %err, "Failed to load commander state; starting fresh");
                CommanderState::new(&entry.fid, &entry.commander)
            }
        };
        commander.name = entry.commander.clone();

        self.identity = Some(Identity {
            name: entry.commander.clone(),
            fid: entry.fid.clone(),
            odyssey,
        });
        self.commander = Some(commander);
        self.shutdown = false;
    }

    /// Rewinds to our arrival in the current system and replays forward.
    fn init_system(&mut self) {
        let Some(live) = self.journal.as_ref() else {
            return;
        };

        let mut window: Vec<Record> = Vec::new();
        let mut last_location: Option<Location> = None;
        let mut start: Option<SystemRecord> = None;

        let outcome = live.journal().walk_deep(&self.navigator, |record| {
            if let Record::Location(entry) = record {
                if last_location.is_none() {
                    last_location = Some(entry.clone());
                    return Visit::Continue;
                }
            }

            // A carrier can jump while we are logged out, leaving only a
            // Location behind. Older records from elsewhere reveal that.
            if let (Some(location), Some(address)) = (&last_location, record.system_address()) {
                if address != location.system_address {
                    start = Some(SystemRecord::new(
                        &location.star_system,
                        location.system_address,
                        location.star_pos,
                    ));
                    return Visit::Stop;
                }
            }

            match record {
                Record::FsdJump(entry) => {
                    start = Some(SystemRecord::new(
                        &entry.star_system,
                        entry.system_address,
                        entry.star_pos,
                    ));
                    Visit::Stop
                }
                Record::CarrierJump(entry) => {
                    start = Some(SystemRecord::new(
                        &entry.star_system,
                        entry.system_address,
                        entry.star_pos,
                    ));
                    Visit::Stop
                }
                other => {
                    window.push(other.clone());
                    Visit::Continue
                }
            }
        });

        let start = start.or_else(|| {
            last_location.as_ref().map(|location| {
                SystemRecord::new(&location.star_system, location.system_address, location.star_pos)
            })
        });
        let Some(start) = start else {
            warn!(?outcome, "No arrival record found in journal history");
            return;
        };
        debug!(
            system = %start.name,
            records = window.len(),
            "Replaying records since arrival"
        );

        let mut system = match self.context.store.load_system(start.address) {
            Ok(Some(saved)) => saved,
            Ok(None) => start.clone(),
            Err(err) => {
                warn!(error = %err, "Failed to load system annotations; rebuilding");
                start.clone()
            }
        };
        for record in window.iter().rev() {
            system.apply(record);
            if let Some(commander) = self.commander.as_mut() {
                commander.apply(record);
            }
        }

        self.location = Some(LocationInfo {
            system: start.name.clone(),
            address: start.address,
            star_pos: start.star_pos,
        });
        self.system = Some(system);
        self.persist_system();
    }

    /// Sets location from the newest location-bearing record of the live file.
    fn restore_location(&mut self) {
        let Some(live) = self.journal.as_ref() else {
            return;
        };

        let mut found: Option<(String, u64, Option<[f64; 3]>, Option<(String, u32)>)> = None;
        live.journal()
            .walk(ScanFrom::End, Direction::Backward, |_, record| {
                let planet = |body: &str, id: u32, body_type: &str| {
                    (body_type == BODY_TYPE_PLANET).then(|| (body.to_string(), id))
                };
                found = match record {
                    Record::Location(entry) => Some((
                        entry.star_system.clone(),
                        entry.system_address,
                        Some(entry.star_pos),
                        planet(&entry.body, entry.body_id, &entry.body_type),
                    )),
                    Record::FsdJump(entry) => Some((
                        entry.star_system.clone(),
                        entry.system_address,
                        Some(entry.star_pos),
                        planet(&entry.body, entry.body_id, &entry.body_type),
                    )),
                    Record::CarrierJump(entry) => Some((
                        entry.star_system.clone(),
                        entry.system_address,
                        Some(entry.star_pos),
                        planet(&entry.body, entry.body_id, &entry.body_type),
                    )),
                    Record::SupercruiseExit(entry) => Some((
                        entry.star_system.clone(),
                        entry.system_address,
                        None,
                        planet(&entry.body, entry.body_id, &entry.body_type),
                    )),
                    Record::ApproachBody(entry) => Some((
                        entry.star_system.clone(),
                        entry.system_address,
                        None,
                        Some((entry.body.clone(), entry.body_id)),
                    )),
                    _ => None,
                };
                if found.is_some() {
                    Visit::Stop
                } else {
                    Visit::Continue
                }
            });

        let Some((system, address, star_pos, body)) = found else {
            self.restore_location_from_commander();
            return;
        };

        let star_pos = star_pos
            .or_else(|| {
                self.location
                    .as_ref()
                    .filter(|location| location.address == address)
                    .map(|location| location.star_pos)
            })
            .unwrap_or_default();
        self.enter_system(&system, address, star_pos);

        let body = body.map(|(name, id)| {
            let radius = self.body_radius_hint(&name);
            (name, id, radius)
        });
        if let Some(commander) = self.commander.as_mut() {
            commander.set_body(body.as_ref().map(|(name, id, radius)| (name.as_str(), *id, *radius)));
        }
        self.persist_commander();
    }

    /// Last resort: whatever the commander slice remembered.
    fn restore_location_from_commander(&mut self) {
        if self.location.is_some() {
            return;
        }
        let Some(commander) = self.commander.as_ref() else {
            return;
        };
        if commander.current_system_address == 0 {
            return;
        }
        let (name, address, star_pos) = (
            commander.current_system.clone(),
            commander.current_system_address,
            commander.star_pos,
        );
        info!(system = %name, "Location restored from saved commander state");
        self.enter_system(&name, address, star_pos);
    }

    /// Radius for `name` from telemetry if it agrees, else the last Scan.
    pub(super) fn body_radius_hint(&self, name: &str) -> Option<f64> {
        let from_status = self
            .status
            .as_ref()
            .filter(|status| status.body_name.as_deref() == Some(name))
            .and_then(|status| status.planet_radius)
            .filter(|radius| *radius > 0.0);
        if from_status.is_some() {
            return from_status;
        }

        let live = self.journal.as_ref()?;
        match live.journal().search_deep::<Scan, Option<f64>, _, _>(
            &self.navigator,
            |scan| (scan.body_name == name).then_some(scan.radius),
            arrival_bound,
        ) {
            SearchOutcome::Found(radius) => radius,
            _ => None,
        }
    }
}
