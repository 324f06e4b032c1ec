//! Current-body resolution and touchdown recovery.
//!
//! When telemetry gains a position fix we know the body's name but not its id
//! or radius. Those come from the most recent journal record that names the
//! body, tried in order of reliability, each cross-checked against telemetry.

use tracing::{debug, info};

use super::types::BodyInfo;
use super::StateEngine;
use crate::error::{Result, SurveyError};
use crate::geo::LatLong;
use crate::journal::record::{
    ApproachBody, FsdJump, Location, SaaSignalsFound, Scan, SupercruiseExit, Touchdown,
};
use crate::journal::{Direction, JournalFile, ScanFrom};
use crate::mode::Mode;

/// Deep searches go no further back than the file holding our arrival jump.
pub(super) fn arrival_bound(file: &JournalFile) -> bool {
    file.search::<FsdJump, (), _>(|_| Some(())).is_some()
}

impl StateEngine {
    /// Finds id and radius for `name` without touching state.
    pub(super) fn resolve_body(&self, name: &str) -> Option<BodyInfo> {
        let journal = self.journal.as_ref()?.journal();
        let navigator = &self.navigator;

        let current_address = self.location.as_ref().map(|location| location.address);
        let current_system = self
            .location
            .as_ref()
            .map(|location| location.system.clone())
            .unwrap_or_default();
        let in_current_system =
            |address: u64| current_address.map_or(true, |current| current == address);
        let system_name = |reported: &str| {
            if reported.is_empty() {
                current_system.clone()
            } else {
                reported.to_string()
            }
        };

        let status_body = self.status.as_ref().and_then(|status| status.body_name.as_deref());
        let status_radius = self
            .status
            .as_ref()
            .and_then(|status| status.planet_radius)
            .filter(|radius| *radius > 0.0);
        let telemetry_agrees = status_body == Some(name);

        let from_scan = journal
            .search_deep::<Scan, BodyInfo, _, _>(
                navigator,
                |scan| {
                    (scan.body_name == name && in_current_system(scan.system_address)).then(|| {
                        BodyInfo {
                            system: system_name(&scan.star_system),
                            system_address: scan.system_address,
                            name: scan.body_name.clone(),
                            id: scan.body_id,
                            radius: scan.radius.or(status_radius),
                        }
                    })
                },
                arrival_bound,
            )
            .found();
        if from_scan.is_some() {
            debug!(body = name, "Body resolved from Scan");
            return from_scan;
        }

        // The remaining sources carry no radius, so telemetry must supply it.
        let radius = match (telemetry_agrees, status_radius) {
            (true, Some(radius)) => radius,
            _ => {
                info!(body = name, "Telemetry does not confirm body; cannot resolve");
                return None;
            }
        };
        let info = |system: &str, address: u64, id: u32| BodyInfo {
            system: system_name(system),
            system_address: address,
            name: name.to_string(),
            id,
            radius: Some(radius),
        };

        let from_approach = journal
            .search_deep::<ApproachBody, BodyInfo, _, _>(
                navigator,
                |entry| {
                    (entry.body == name && in_current_system(entry.system_address))
                        .then(|| info(&entry.star_system, entry.system_address, entry.body_id))
                },
                arrival_bound,
            )
            .found();
        if from_approach.is_some() {
            debug!(body = name, "Body resolved from ApproachBody");
            return from_approach;
        }

        let from_location = journal.search::<Location, BodyInfo, _>(|entry| {
            (entry.body == name && in_current_system(entry.system_address))
                .then(|| info(&entry.star_system, entry.system_address, entry.body_id))
        });
        if from_location.is_some() {
            debug!(body = name, "Body resolved from Location");
            return from_location;
        }

        let from_exit = journal.search::<SupercruiseExit, BodyInfo, _>(|entry| {
            (entry.body == name && in_current_system(entry.system_address))
                .then(|| info(&entry.star_system, entry.system_address, entry.body_id))
        });
        if from_exit.is_some() {
            debug!(body = name, "Body resolved from SupercruiseExit");
            return from_exit;
        }

        let current_address = current_address?;
        journal
            .search_deep::<SaaSignalsFound, BodyInfo, _, _>(
                navigator,
                |entry| {
                    (entry.body_name == name && entry.system_address == current_address)
                        .then(|| info("", entry.system_address, entry.body_id))
                },
                arrival_bound,
            )
            .found()
    }

    /// Resolves and installs `name` as the current body.
    pub(super) fn materialize_body(&mut self, name: &str) -> Result<Option<BodyInfo>> {
        let Some(body) = self.resolve_body(name) else {
            info!(body = name, "Failed to resolve any record for body");
            return Ok(None);
        };
        self.attach_body(body.clone())?;
        Ok(Some(body))
    }

    /// Makes `body` current, creating its annotation entry if needed.
    pub(super) fn attach_body(&mut self, body: BodyInfo) -> Result<()> {
        let system = self.system.as_mut().ok_or_else(|| {
            SurveyError::InvariantViolation(format!(
                "current body '{}' has no system annotations",
                body.name
            ))
        })?;
        if system.address != body.system_address {
            return Err(SurveyError::InvariantViolation(format!(
                "body '{}' belongs to system {} but annotations are for {}",
                body.name, body.system_address, system.address
            )));
        }

        let entry = system.body_entry(&body.name, body.id);
        if entry.radius.is_none() {
            entry.radius = body.radius;
        }

        info!(body = %body.name, id = body.id, radius = ?body.radius, "Current body set");
        if let Some(commander) = self.commander.as_mut() {
            commander.set_body(Some((body.name.as_str(), body.id, body.radius)));
        }
        self.body = Some(body);
        self.persist_system();
        self.persist_commander();
        Ok(())
    }

    /// True while telemetry places us on the surface.
    pub(super) fn status_landed(&self) -> bool {
        matches!(self.derive(), Mode::Landed | Mode::InSrv | Mode::OnFoot)
    }

    /// Finds where we last touched down on the current body.
    pub(super) fn recover_touchdown(&mut self) {
        if self.touchdown.is_some() {
            return;
        }
        let (Some(body), Some(live)) = (self.body.as_ref(), self.journal.as_ref()) else {
            return;
        };
        let journal = live.journal();

        if self.derive() == Mode::Landed {
            let from_location = journal
                .find_last_of_kind::<Location>(ScanFrom::End, Direction::Backward)
                .filter(|entry| {
                    entry.system_address == body.system_address && entry.body_id == body.id
                })
                .and_then(Location::lat_long);
            if let Some(position) = from_location {
                info!(%position, "Touchdown recovered from Location");
                self.set_touchdown(position);
                return;
            }
        }

        let status_body = self
            .status
            .as_ref()
            .and_then(|status| status.body_name.clone());
        let found = journal
            .search_deep::<Touchdown, LatLong, _, _>(
                &self.navigator,
                |entry| (Some(&entry.body) == status_body.as_ref()).then(|| entry.lat_long()),
                arrival_bound,
            )
            .found();
        match found {
            Some(position) => {
                info!(%position, "Touchdown recovered from journal history");
                self.set_touchdown(position);
            }
            None => debug!("No touchdown found for current body"),
        }
    }

    pub(super) fn set_touchdown(&mut self, position: LatLong) {
        self.touchdown = Some(position);
        if let (Some(body), Some(system)) = (self.body.as_ref(), self.system.as_mut()) {
            if let Some(entry) = system.body_mut(&body.name) {
                entry.last_touchdown = Some(position);
            }
        }
    }
}
