//! The state engine: sole owner of derived game state.
//!
//! A [`StateEngine`] is built once per live journal file. Construction runs a
//! cold start from journal history; afterwards every change arrives as an
//! [`EngineInput`] through [`StateEngine::handle`], on one thread. Consumers
//! subscribe for [`EngineEvent`]s or query synchronously.

mod body;
mod cold_start;
mod types;

pub use types::*;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::annotations::{BodyRecord, SystemRecord};
use crate::bookmarks::BookmarkOutcome;
use crate::commander::CommanderState;
use crate::context::SurveyContext;
use crate::enrichment::{spawn_lookup, SystemEnrichment};
use crate::error::{Result, SurveyError};
use crate::geo::LatLong;
use crate::journal::record::{
    Music, Record, BODY_TYPE_PLANET, JUMP_TYPE_HYPERSPACE, MUSIC_CARRIER_MANAGEMENT,
    MUSIC_MAIN_MENU,
};
use crate::journal::{ChainNavigator, LiveJournal};
use crate::mode::{derive_mode, Mode, ModeInputs};
use crate::telemetry::{read_snapshot, NavRoute, Status};

pub struct StateEngine {
    context: SurveyContext,
    navigator: ChainNavigator,
    journal: Option<LiveJournal>,
    functional: bool,

    identity: Option<Identity>,
    commander: Option<CommanderState>,
    system: Option<SystemRecord>,
    location: Option<LocationInfo>,
    body: Option<BodyInfo>,
    touchdown: Option<LatLong>,

    status: Option<Status>,
    route: Option<NavRoute>,
    status_has_lat_long: bool,
    /// Last accepted telemetry body name, used to spot two games writing the
    /// same status file.
    status_body_name: Option<String>,

    process_running: bool,
    shutdown: bool,
    at_main_menu: bool,
    at_carrier_management: bool,
    jumping: bool,
    mode: Mode,

    subscribers: Vec<Sender<EngineEvent>>,
    inputs: Option<Sender<EngineInput>>,
    enrichment_in_flight: HashSet<String>,
    /// Systems whose lookup failed this session; never asked again.
    enrichment_failed: HashSet<String>,
    enrichment: Option<SystemEnrichment>,
}

impl StateEngine {
    /// Builds an engine on the newest journal for `commander` (any commander
    /// when `None`) and reconstructs state from history.
    ///
    /// A missing journal folder is an error. A folder with no journal for the
    /// commander yields a non-functional engine that stays `Offline`.
    /// `inputs` is where background work (enrichment) posts its results.
    pub fn new(
        context: SurveyContext,
        commander: Option<&str>,
        inputs: Option<Sender<EngineInput>>,
    ) -> Result<Self> {
        let navigator = context.navigator();
        let latest = navigator.find_latest(commander)?;
        if latest.is_none() {
            warn!(commander = ?commander, "No journal found; engine is not functional");
        }
        Self::build(context, navigator, latest, inputs)
    }

    /// Builds an engine on `path`, a journal the game just created. Its
    /// commander is usually not written yet, so no identity check is made.
    pub fn open(
        context: SurveyContext,
        path: &Path,
        inputs: Option<Sender<EngineInput>>,
    ) -> Result<Self> {
        let navigator = context.navigator();
        Self::build(context, navigator, Some(path.to_path_buf()), inputs)
    }

    fn build(
        context: SurveyContext,
        navigator: ChainNavigator,
        path: Option<PathBuf>,
        inputs: Option<Sender<EngineInput>>,
    ) -> Result<Self> {
        let status = read_snapshot::<Status>(&context.storage.status_file()).unwrap_or_else(|err| {
            warn!(error = %err, "Failed to read status snapshot");
            None
        });
        let route = read_snapshot::<NavRoute>(&context.storage.nav_route_file()).unwrap_or_else(|err| {
            warn!(error = %err, "Failed to read route snapshot");
            None
        });
        let process_running = context.probe.is_running();

        let mut engine = Self {
            context,
            navigator,
            journal: None,
            functional: false,
            identity: None,
            commander: None,
            system: None,
            location: None,
            body: None,
            touchdown: None,
            status_has_lat_long: status.as_ref().is_some_and(Status::has_lat_long),
            status_body_name: status.as_ref().and_then(|status| status.body_name.clone()),
            status,
            route,
            process_running,
            shutdown: false,
            at_main_menu: false,
            at_carrier_management: false,
            jumping: false,
            mode: Mode::Offline,
            subscribers: Vec::new(),
            inputs,
            enrichment_in_flight: HashSet::new(),
            enrichment_failed: HashSet::new(),
            enrichment: None,
        };

        match path {
            Some(path) => {
                info!(path = %path.display(), "Opening live journal");
                engine.journal = Some(LiveJournal::open(&path)?);
                engine.functional = true;
                engine.cold_start()?;
                if let Some(location) = engine.location.clone() {
                    engine.request_enrichment(&location.system);
                }
            }
            None => engine.shutdown = true,
        }

        engine.mode = engine.derive();
        info!(mode = %engine.mode, "Engine ready");
        Ok(engine)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inputs
    // ─────────────────────────────────────────────────────────────────────────

    /// Consumes one input. Errors are invariant violations or live-file I/O
    /// failures; both mean the engine can no longer be trusted.
    pub fn handle(&mut self, input: EngineInput) -> Result<Control> {
        match input {
            EngineInput::JournalChanged => {
                let Some(live) = self.journal.as_mut() else {
                    return Ok(Control::Continue);
                };
                let mut appended = Vec::new();
                live.poll(|record, _| appended.push(record.clone()))?;
                for record in &appended {
                    self.apply_record(record)?;
                }
            }
            EngineInput::JournalCreated(path) => {
                let current = self.journal.as_ref().map(|live| live.path().to_path_buf());
                if current.as_deref() != Some(path.as_path()) {
                    info!(path = %path.display(), "New journal file; rebuilding engine");
                    return Ok(Control::Rebuild(Some(path)));
                }
            }
            EngineInput::Telemetry(status) => self.apply_status(status)?,
            EngineInput::Route(route) => {
                debug!(hops = route.route.len(), "Route updated");
                self.route = Some(route);
            }
            EngineInput::ProcessTick => {
                let running = self.context.probe.is_running();
                if running == self.process_running {
                    return Ok(Control::Continue);
                }
                self.process_running = running;
                if running {
                    info!("Game process started; rebuilding engine");
                    return Ok(Control::Rebuild(None));
                }
                info!("Game process stopped");
                self.shutdown = true;
                self.evaluate_mode();
            }
            EngineInput::Enrichment { system, result } => {
                self.enrichment_in_flight.remove(&system);
                let enrichment = match result {
                    Ok(enrichment) => enrichment,
                    Err(err) => {
                        warn!(system = %system, error = %err, "Enrichment lookup failed");
                        self.enrichment_failed.insert(system);
                        return Ok(Control::Continue);
                    }
                };
                let current = self.location.as_ref().map(|location| location.system.as_str());
                if current != Some(system.as_str()) {
                    debug!(system = %system, "Discarding stale enrichment");
                    return Ok(Control::Continue);
                }
                info!(system = %system, "Enrichment loaded");
                self.enrichment = Some(enrichment);
            }
        }
        Ok(Control::Continue)
    }

    fn apply_record(&mut self, record: &Record) -> Result<()> {
        debug!(event = record.kind(), "Journal record");
        match record {
            Record::LoadGame(entry) => {
                self.set_identity(entry);
                self.at_main_menu = false;
            }
            Record::Shutdown(_) => {
                info!("Game shut down");
                self.at_main_menu = false;
                self.shutdown = true;
                self.force_update();
            }
            Record::Music(entry) => self.apply_music(entry),
            Record::StartJump(entry) => {
                if entry.jump_type == JUMP_TYPE_HYPERSPACE {
                    self.jumping = true;
                }
            }
            Record::FsdJump(entry) => {
                self.jumping = false;
                self.status_body_name = None;
                let planet = (entry.body_type == BODY_TYPE_PLANET).then_some((entry.body.as_str(), entry.body_id));
                self.arrive(&entry.star_system, entry.system_address, entry.star_pos, planet)?;
            }
            Record::CarrierJump(entry) => {
                let planet = (entry.body_type == BODY_TYPE_PLANET).then_some((entry.body.as_str(), entry.body_id));
                self.arrive(&entry.star_system, entry.system_address, entry.star_pos, planet)?;
            }
            Record::Location(entry) => {
                let planet = (entry.body_type == BODY_TYPE_PLANET).then_some((entry.body.as_str(), entry.body_id));
                self.arrive(&entry.star_system, entry.system_address, entry.star_pos, planet)?;
            }
            Record::SupercruiseExit(entry) => {
                if entry.body_type == BODY_TYPE_PLANET {
                    let radius = self.body_radius_hint(&entry.body);
                    if let Some(commander) = self.commander.as_mut() {
                        commander.set_body(Some((entry.body.as_str(), entry.body_id, radius)));
                    }
                    self.persist_commander();
                }
            }
            Record::ApproachBody(entry) => {
                let radius = self.body_radius_hint(&entry.body);
                if let Some(commander) = self.commander.as_mut() {
                    commander.set_body(Some((entry.body.as_str(), entry.body_id, radius)));
                }
                self.persist_commander();
                self.approach(&entry.body)?;
            }
            Record::ApproachSettlement(entry) => self.approach(&entry.body_name)?,
            Record::SaaSignalsFound(entry) => self.approach(&entry.body_name)?,
            Record::Touchdown(entry) => {
                info!(body = %entry.body, position = %entry.lat_long(), "Touchdown");
                self.set_touchdown(entry.lat_long());
            }
            Record::Liftoff(_) => {
                info!("Liftoff");
                self.touchdown = None;
            }
            _ => {}
        }

        let system_changed = self
            .system
            .as_mut()
            .is_some_and(|system| system.apply(record));
        if system_changed {
            self.persist_system();
        }
        let commander_changed = self
            .commander
            .as_mut()
            .is_some_and(|commander| commander.apply(record));
        if commander_changed {
            self.persist_commander();
        }

        self.evaluate_mode();
        Ok(())
    }

    pub(super) fn apply_music(&mut self, entry: &Music) {
        self.at_main_menu = entry.music_track == MUSIC_MAIN_MENU;
        self.at_carrier_management = entry.music_track == MUSIC_CARRIER_MANAGEMENT;
    }

    /// Location-arrival: new system, new annotations, body only if named.
    fn arrive(
        &mut self,
        system: &str,
        address: u64,
        star_pos: [f64; 3],
        planet: Option<(&str, u32)>,
    ) -> Result<()> {
        info!(system, address, "Arrived in system");
        let system_changed = self.location.as_ref().map_or(true, |location| location.address != address);
        self.enter_system(system, address, star_pos);
        if system_changed {
            self.enrichment = None;
        }
        self.request_enrichment(system);

        match planet {
            Some((name, id)) => {
                let radius = self.body_radius_hint(name);
                self.attach_body(BodyInfo {
                    system: system.to_string(),
                    system_address: address,
                    name: name.to_string(),
                    id,
                    radius,
                })?;
                if self.status_landed() {
                    self.recover_touchdown();
                }
            }
            None => {
                self.body = None;
                self.touchdown = None;
                if let Some(commander) = self.commander.as_mut() {
                    commander.set_body(None);
                }
                self.persist_commander();
            }
        }
        Ok(())
    }

    /// Switches location and annotations to `address`, loading saved
    /// annotations when we have been here before.
    pub(super) fn enter_system(&mut self, name: &str, address: u64, star_pos: [f64; 3]) {
        self.location = Some(LocationInfo {
            system: name.to_string(),
            address,
            star_pos,
        });
        if let Some(commander) = self.commander.as_mut() {
            commander.set_location(name, address, star_pos);
        }

        if self.system.as_ref().map(|system| system.address) != Some(address) {
            let system = match self.context.store.load_system(address) {
                Ok(Some(saved)) => saved,
                Ok(None) => SystemRecord::new(name, address, star_pos),
                Err(err) => {
                    warn!(error = %err, system = name, "Failed to load system annotations");
                    SystemRecord::new(name, address, star_pos)
                }
            };
            self.system = Some(system);
            self.body = None;
            self.touchdown = None;
        }
        self.persist_system();
        self.persist_commander();
    }

    /// A record placed us near `name`; resolve it if nothing is current yet.
    fn approach(&mut self, name: &str) -> Result<()> {
        if self.body.is_some() {
            return Ok(());
        }
        if let Some(body) = self.materialize_body(name)? {
            self.emit(EngineEvent::NearingBody(body));
        }
        Ok(())
    }

    fn apply_status(&mut self, status: Status) -> Result<()> {
        if let (Some(previous), Some(next)) = (&self.status_body_name, &status.body_name) {
            if previous != next {
                warn!(
                    previous = %previous,
                    next = %next,
                    "Telemetry body changed without clearing; multiple games running?"
                );
                return Ok(());
            }
        }
        self.status_body_name = status.body_name.clone();

        let has_lat_long = status.has_lat_long();
        let body_name = status.body_name.clone();
        self.status = Some(status);

        if has_lat_long != self.status_has_lat_long {
            info!(has_lat_long, body = ?body_name, "Telemetry position fix changed");
            self.status_has_lat_long = has_lat_long;

            if !has_lat_long {
                if let Some(body) = self.body.take() {
                    info!(body = %body.name, "Departing body");
                    self.touchdown = None;
                    if let Some(commander) = self.commander.as_mut() {
                        commander.set_body(None);
                    }
                    self.persist_commander();
                    self.emit(EngineEvent::DepartingBody(body));
                }
            } else if self.body.is_none() {
                if let Some(name) = body_name {
                    if let Some(body) = self.materialize_body(&name)? {
                        self.emit(EngineEvent::NearingBody(body));
                    }
                }
            }
        }

        self.evaluate_mode();
        Ok(())
    }

    fn request_enrichment(&mut self, system: &str) {
        if !self.context.settings.auto_load_enrichment {
            return;
        }
        let (Some(provider), Some(tx)) = (self.context.enrichment.clone(), self.inputs.clone()) else {
            return;
        };
        if self.enrichment.as_ref().is_some_and(|loaded| loaded.system == system) {
            return;
        }
        if self.enrichment_failed.contains(system) {
            return;
        }
        if !self.enrichment_in_flight.insert(system.to_string()) {
            debug!(system, "Enrichment already in flight");
            return;
        }
        spawn_lookup(provider, system.to_string(), tx);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mode and notifications
    // ─────────────────────────────────────────────────────────────────────────

    pub(super) fn derive(&self) -> Mode {
        derive_mode(&ModeInputs {
            process_running: self.process_running,
            shutdown: self.shutdown || !self.functional,
            at_main_menu: self.at_main_menu,
            at_carrier_management: self.at_carrier_management,
            identity_known: self.identity.is_some(),
            jumping: self.jumping,
            status: self.status.as_ref(),
        })
    }

    fn evaluate_mode(&mut self) {
        let mode = self.derive();
        if mode != self.mode {
            info!(from = %self.mode, to = %mode, "Mode changed");
            self.mode = mode;
            self.emit(EngineEvent::ModeChanged { mode, forced: false });
        }
    }

    /// Re-derives and notifies subscribers even if the mode is unchanged.
    pub fn force_update(&mut self) {
        self.mode = self.derive();
        self.emit(EngineEvent::ModeChanged {
            mode: self.mode,
            forced: true,
        });
    }

    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: EngineEvent) {
        debug!(?event, "Engine event");
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────────────────

    pub(super) fn persist_system(&self) {
        if let Some(system) = &self.system {
            if let Err(err) = self.context.store.save_system(system) {
                warn!(error = %err, system = %system.name, "Failed to save system annotations");
            }
        }
    }

    pub(super) fn persist_commander(&self) {
        if let Some(commander) = &self.commander {
            if let Err(err) = self.context.store.save_commander(commander) {
                warn!(error = %err, fid = %commander.fid, "Failed to save commander state");
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn is_functional(&self) -> bool {
        self.functional
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn commander(&self) -> Option<&CommanderState> {
        self.commander.as_ref()
    }

    pub fn location(&self) -> Option<&LocationInfo> {
        self.location.as_ref()
    }

    pub fn body(&self) -> Option<&BodyInfo> {
        self.body.as_ref()
    }

    pub fn touchdown(&self) -> Option<LatLong> {
        self.touchdown
    }

    pub fn system(&self) -> Option<&SystemRecord> {
        self.system.as_ref()
    }

    pub fn journal(&self) -> Option<&LiveJournal> {
        self.journal.as_ref()
    }

    /// Bookmarks on the current body, if any.
    pub fn bookmarks(&self) -> Option<&BTreeMap<String, Vec<LatLong>>> {
        let body = self.body.as_ref()?;
        self.system.as_ref()?.body(&body.name)?.bookmarks.as_ref()
    }

    /// Next hop on the plotted route.
    pub fn next_system(&self) -> Option<&str> {
        let current = self.location.as_ref().map(|location| location.address);
        self.route
            .as_ref()?
            .next_after(current)
            .map(|hop| hop.star_system.as_str())
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            functional: self.functional,
            commander: self.identity.clone(),
            mode: self.mode,
            vehicle: self.status.as_ref().map(Status::vehicle),
            suit: self.commander.as_ref().and_then(|commander| commander.suit.clone()),
            location: self.location.clone(),
            body: self.body.clone(),
            touchdown: self.touchdown,
            next_system: self.next_system().map(str::to_string),
            unsold_organics: self
                .commander
                .as_ref()
                .map_or(0, |commander| commander.scanned_organics.len()),
            enrichment: self.enrichment.clone(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bookmarks
    // ─────────────────────────────────────────────────────────────────────────

    pub fn add_bookmark(&mut self, name: &str, position: LatLong) -> Result<BookmarkOutcome> {
        let radius = self.current_radius()?;
        let outcome = self.current_body_record_mut()?.add_bookmark(name, position, radius);
        if outcome == BookmarkOutcome::Added {
            info!(name, %position, "Bookmark added");
            self.persist_system();
        }
        Ok(outcome)
    }

    /// Removes the nearest (or farthest) `name` bookmark to `position`.
    pub fn remove_bookmark(
        &mut self,
        name: &str,
        position: LatLong,
        prefer_nearest: bool,
    ) -> Result<Option<LatLong>> {
        let radius = self.current_radius()?;
        let removed = self
            .current_body_record_mut()?
            .remove_bookmark(name, position, radius, prefer_nearest);
        if removed.is_some() {
            self.persist_system();
        }
        Ok(removed)
    }

    pub fn remove_bookmark_name(&mut self, name: &str) -> Result<bool> {
        let removed = self.current_body_record_mut()?.remove_bookmark_name(name);
        if removed {
            self.persist_system();
        }
        Ok(removed)
    }

    pub fn clear_bookmarks(&mut self) -> Result<()> {
        self.current_body_record_mut()?.clear_bookmarks();
        self.persist_system();
        Ok(())
    }

    fn current_radius(&self) -> Result<f64> {
        let body = self.body.as_ref().ok_or(SurveyError::NoCurrentBody)?;
        body.radius
            .or_else(|| {
                self.status
                    .as_ref()
                    .filter(|status| status.body_name.as_deref() == Some(body.name.as_str()))
                    .and_then(|status| status.planet_radius)
            })
            .filter(|radius| *radius > 0.0)
            .ok_or_else(|| {
                SurveyError::InvariantViolation(format!("current body '{}' has no radius", body.name))
            })
    }

    fn current_body_record_mut(&mut self) -> Result<&mut BodyRecord> {
        let body = self.body.as_ref().ok_or(SurveyError::NoCurrentBody)?;
        let system = self.system.as_mut().ok_or_else(|| {
            SurveyError::InvariantViolation(format!(
                "current body '{}' has no system annotations",
                body.name
            ))
        })?;
        if system.body(&body.name).is_none() {
            return Err(SurveyError::InvariantViolation(format!(
                "current body '{}' missing from annotations for {}",
                body.name, system.name
            )));
        }
        system
            .body_mut(&body.name)
            .ok_or_else(|| SurveyError::InvariantViolation(format!("body '{}' vanished", body.name)))
    }
}
