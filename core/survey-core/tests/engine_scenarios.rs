//! End-to-end engine scenarios against journal fixtures in a temp folder.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use survey_core::{
    AnnotationStore, BookmarkOutcome, Control, EngineEvent, EngineInput, EnrichmentProvider,
    JsonAnnotationStore, LatLong, Mode, ProcessProbe, Settings, StateEngine, StaticProbe, Status,
    StorageConfig, SurveyContext, SurveyError, SystemEnrichment,
};

const SOL: u64 = 10477373803;
const ACHENAR: u64 = 164098653;
const EARTH_RADIUS: f64 = 6371000.0;

/// HasLatLong | InMainShip
const FLYING_NEAR_SURFACE: u32 = (1 << 21) | (1 << 24);
/// HasLatLong | InMainShip | Landed
const LANDED: u32 = (1 << 21) | (1 << 24) | (1 << 1);
/// InMainShip
const FLYING: u32 = 1 << 24;

struct Fixture {
    _temp: tempfile::TempDir,
    journals: PathBuf,
    storage: StorageConfig,
}

impl Fixture {
    fn new() -> Self {
        let temp = tempfile::tempdir().expect("temp dir");
        let journals = temp.path().join("journals");
        fs_err::create_dir_all(&journals).expect("journal dir");
        let storage = StorageConfig::with_roots(temp.path().join("data"), journals.clone());
        Self {
            _temp: temp,
            journals,
            storage,
        }
    }

    fn context(&self) -> SurveyContext {
        let settings = Settings {
            auto_load_enrichment: false,
            ..Settings::default()
        };
        SurveyContext::new(settings, self.storage.clone())
            .with_probe(Arc::new(StaticProbe(true)))
            .with_store(Arc::new(JsonAnnotationStore::new(self.storage.clone())))
    }

    /// Context with lookups enabled and answered by `provider`.
    fn enriching_context(&self, provider: Arc<dyn EnrichmentProvider>) -> SurveyContext {
        SurveyContext::new(Settings::default(), self.storage.clone())
            .with_probe(Arc::new(StaticProbe(true)))
            .with_enrichment(Some(provider))
    }

    fn journal(&self, name: &str, lines: &[String]) -> PathBuf {
        let path = self.journals.join(name);
        let mut content = lines.join("\n");
        content.push('\n');
        fs_err::write(&path, content).expect("write journal");
        path
    }

    fn status(&self, flags: u32, body: Option<&str>) {
        fs_err::write(self.storage.status_file(), status_json(flags, body)).expect("write status");
    }
}

fn status_json(flags: u32, body: Option<&str>) -> String {
    match body {
        Some(body) => format!(
            r#"{{ "timestamp":"2024-03-01T10:05:00Z", "event":"Status", "Flags":{}, "Latitude":1.0, "Longitude":2.0, "BodyName":"{}", "PlanetRadius":{} }}"#,
            flags, body, EARTH_RADIUS
        ),
        None => format!(
            r#"{{ "timestamp":"2024-03-01T10:05:00Z", "event":"Status", "Flags":{} }}"#,
            flags
        ),
    }
}

fn status(flags: u32, body: Option<&str>) -> Status {
    serde_json::from_str(&status_json(flags, body)).expect("status parses")
}

fn line(body: &str) -> String {
    format!(r#"{{ "timestamp":"2024-03-01T10:00:00Z", {} }}"#, body)
}

fn session_start(commander: &str) -> Vec<String> {
    vec![
        line(r#""event":"Fileheader", "part":1, "Odyssey":true, "gameversion":"4.0""#),
        line(&format!(r#""event":"Commander", "FID":"F-{0}", "Name":"{0}""#, commander)),
        line(&format!(
            r#""event":"LoadGame", "FID":"F-{0}", "Commander":"{0}", "Odyssey":true"#,
            commander
        )),
    ]
}

fn jump_to_sol() -> String {
    line(&format!(
        r#""event":"FSDJump", "StarSystem":"Sol", "SystemAddress":{}, "StarPos":[0.0,0.0,0.0]"#,
        SOL
    ))
}

fn jump_to_achenar() -> String {
    line(&format!(
        r#""event":"FSDJump", "StarSystem":"Achenar", "SystemAddress":{}, "StarPos":[67.5,-119.46875,24.84375]"#,
        ACHENAR
    ))
}

fn location_in_sol() -> String {
    line(&format!(
        r#""event":"Location", "StarSystem":"Sol", "SystemAddress":{}, "StarPos":[0.0,0.0,0.0]"#,
        SOL
    ))
}

fn touchdown_on_earth(latitude: f64, longitude: f64) -> String {
    line(&format!(
        r#""event":"Touchdown", "StarSystem":"Sol", "SystemAddress":{}, "Body":"Earth", "BodyID":3, "Latitude":{:.1}, "Longitude":{:.1}"#,
        SOL, latitude, longitude
    ))
}

fn scan_earth() -> String {
    line(&format!(
        r#""event":"Scan", "StarSystem":"Sol", "SystemAddress":{}, "BodyName":"Earth", "BodyID":3, "Radius":{}"#,
        SOL, EARTH_RADIUS
    ))
}

fn approach_earth() -> String {
    line(&format!(
        r#""event":"ApproachBody", "StarSystem":"Sol", "SystemAddress":{}, "Body":"Earth", "BodyID":3"#,
        SOL
    ))
}

fn append(path: &Path, text: &str) {
    let mut file = fs_err::OpenOptions::new()
        .append(true)
        .open(path)
        .expect("open for append");
    writeln!(file, "{}", text).expect("append");
}

fn age(path: &Path, secs: u64) {
    let when = SystemTime::now() - Duration::from_secs(secs);
    std::fs::File::options()
        .write(true)
        .open(path)
        .and_then(|file| file.set_modified(when))
        .expect("set mtime");
}

fn body_events(events: &Receiver<EngineEvent>) -> Vec<EngineEvent> {
    events
        .try_iter()
        .filter(|event| !matches!(event, EngineEvent::ModeChanged { .. }))
        .collect()
}

/// CMDR1 in Sol, approaching Earth with telemetry confirming the body.
fn near_earth(fixture: &Fixture) -> (PathBuf, StateEngine) {
    let mut lines = session_start("CMDR1");
    lines.extend([jump_to_sol(), scan_earth(), approach_earth()]);
    let path = fixture.journal("Journal.2024-03-01T100000.01.log", &lines);
    fixture.status(FLYING_NEAR_SURFACE, Some("Earth"));

    let engine = StateEngine::new(fixture.context(), Some("CMDR1"), None).expect("engine builds");
    (path, engine)
}

#[test]
fn cold_start_then_touchdown_and_liftoff() {
    let fixture = Fixture::new();
    let (path, mut engine) = near_earth(&fixture);

    assert!(engine.is_functional());
    assert_eq!(engine.identity().map(|identity| identity.name.as_str()), Some("CMDR1"));
    assert_eq!(engine.location().map(|location| location.address), Some(SOL));
    assert_eq!(engine.mode(), Mode::Flying);

    let body = engine.body().expect("Earth is current");
    assert_eq!(body.name, "Earth");
    assert_eq!(body.id, 3);
    assert_eq!(body.radius, Some(EARTH_RADIUS));
    assert_eq!(engine.touchdown(), None);

    append(&path, &touchdown_on_earth(10.0, 20.0));
    engine.handle(EngineInput::JournalChanged).expect("touchdown applies");
    assert_eq!(engine.touchdown(), Some(LatLong::new(10.0, 20.0)));

    append(
        &path,
        &line(&format!(
            r#""event":"Liftoff", "StarSystem":"Sol", "SystemAddress":{}, "Body":"Earth", "BodyID":3"#,
            SOL
        )),
    );
    engine.handle(EngineInput::JournalChanged).expect("liftoff applies");
    assert_eq!(engine.touchdown(), None);
}

#[test]
fn touchdown_already_in_history_is_recovered_at_cold_start() {
    let fixture = Fixture::new();
    let mut lines = session_start("CMDR1");
    lines.extend([
        jump_to_sol(),
        scan_earth(),
        approach_earth(),
        touchdown_on_earth(10.0, 20.0),
    ]);
    let path = fixture.journal("Journal.2024-03-01T100000.01.log", &lines);
    fixture.status(LANDED, Some("Earth"));

    let mut engine = StateEngine::new(fixture.context(), Some("CMDR1"), None).expect("engine builds");

    assert_eq!(engine.identity().map(|identity| identity.name.as_str()), Some("CMDR1"));
    assert_eq!(engine.location().map(|location| location.system.as_str()), Some("Sol"));
    let body = engine.body().expect("Earth is current");
    assert_eq!(body.name, "Earth");
    assert_eq!(body.radius, Some(EARTH_RADIUS));
    assert_eq!(engine.touchdown(), Some(LatLong::new(10.0, 20.0)));

    append(
        &path,
        &line(&format!(
            r#""event":"Liftoff", "StarSystem":"Sol", "SystemAddress":{}, "Body":"Earth", "BodyID":3"#,
            SOL
        )),
    );
    engine.handle(EngineInput::JournalChanged).expect("liftoff applies");
    assert_eq!(engine.touchdown(), None);
}

#[test]
fn live_shutdown_forces_offline_notification() {
    let fixture = Fixture::new();
    let (path, mut engine) = near_earth(&fixture);
    let events = engine.subscribe();

    append(&path, &line(r#""event":"Shutdown""#));
    engine.handle(EngineInput::JournalChanged).expect("shutdown applies");

    assert_eq!(engine.mode(), Mode::Offline);
    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        vec![EngineEvent::ModeChanged {
            mode: Mode::Offline,
            forced: true
        }]
    );
}

#[test]
fn telemetry_drives_mode_changes_once() {
    let fixture = Fixture::new();
    let (_path, mut engine) = near_earth(&fixture);
    let events = engine.subscribe();

    engine
        .handle(EngineInput::Telemetry(status(LANDED, Some("Earth"))))
        .expect("status applies");
    engine
        .handle(EngineInput::Telemetry(status(LANDED, Some("Earth"))))
        .expect("status applies");

    let changes: Vec<_> = events.try_iter().collect();
    assert_eq!(
        changes,
        vec![EngineEvent::ModeChanged {
            mode: Mode::Landed,
            forced: false
        }]
    );

    engine.force_update();
    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        vec![EngineEvent::ModeChanged {
            mode: Mode::Landed,
            forced: true
        }]
    );
}

#[test]
fn departing_and_nearing_fire_exactly_once_per_flip() {
    let fixture = Fixture::new();
    let (_path, mut engine) = near_earth(&fixture);
    let events = engine.subscribe();

    for _ in 0..2 {
        engine
            .handle(EngineInput::Telemetry(status(FLYING, None)))
            .expect("status applies");
    }
    let departed = body_events(&events);
    assert_eq!(departed.len(), 1);
    assert!(matches!(&departed[0], EngineEvent::DepartingBody(body) if body.name == "Earth"));
    assert!(engine.body().is_none());

    for _ in 0..2 {
        engine
            .handle(EngineInput::Telemetry(status(FLYING_NEAR_SURFACE, Some("Earth"))))
            .expect("status applies");
    }
    let neared = body_events(&events);
    assert_eq!(neared.len(), 1);
    assert!(matches!(&neared[0], EngineEvent::NearingBody(body) if body.name == "Earth" && body.id == 3));
    assert_eq!(engine.body().map(|body| body.name.as_str()), Some("Earth"));
}

#[test]
fn body_name_flip_from_another_writer_is_discarded() {
    let fixture = Fixture::new();
    let (_path, mut engine) = near_earth(&fixture);

    engine
        .handle(EngineInput::Telemetry(status(LANDED, Some("Mars"))))
        .expect("status handled");

    assert_eq!(engine.mode(), Mode::Flying);
    assert_eq!(engine.body().map(|body| body.name.as_str()), Some("Earth"));
}

#[test]
fn bookmarks_persist_with_the_system() {
    let fixture = Fixture::new();
    let (_path, mut engine) = near_earth(&fixture);

    let camp = LatLong::new(1.0, 2.0);
    assert_eq!(engine.add_bookmark("camp", camp).expect("add"), BookmarkOutcome::Added);
    assert_eq!(
        engine
            .add_bookmark("camp", LatLong::new(1.00001, 2.0))
            .expect("add near"),
        BookmarkOutcome::TooClose
    );
    assert_eq!(
        engine.bookmarks().and_then(|marks| marks.get("camp")).map(Vec::len),
        Some(1)
    );

    let store = JsonAnnotationStore::new(fixture.storage.clone());
    let saved = store.load_system(SOL).expect("load").expect("system saved");
    let earth = saved.body("Earth").expect("Earth saved");
    assert!(earth.bookmarks.as_ref().is_some_and(|marks| marks.contains_key("camp")));

    assert!(engine.remove_bookmark_name("camp").expect("remove"));
    assert!(engine.bookmarks().is_none());
}

#[test]
fn bookmarks_need_a_current_body() {
    let fixture = Fixture::new();
    let mut lines = session_start("CMDR1");
    lines.push(jump_to_sol());
    fixture.journal("Journal.2024-03-01T100000.01.log", &lines);
    fixture.status(FLYING, None);

    let mut engine = StateEngine::new(fixture.context(), None, None).expect("engine builds");
    assert!(matches!(
        engine.add_bookmark("camp", LatLong::new(0.0, 0.0)),
        Err(SurveyError::NoCurrentBody)
    ));
}

#[test]
fn landed_login_recovers_body_and_touchdown_from_history() {
    let fixture = Fixture::new();

    let mut older = session_start("CMDR1");
    older.extend([
        jump_to_sol(),
        scan_earth(),
        touchdown_on_earth(5.0, 6.0),
    ]);
    let older_path = fixture.journal("Journal.2024-02-28T100000.01.log", &older);
    age(&older_path, 3600);

    let mut newer = session_start("CMDR1");
    newer.push(line(&format!(
        r#""event":"Location", "StarSystem":"Sol", "SystemAddress":{}, "StarPos":[0.0,0.0,0.0], "Body":"Earth", "BodyID":3, "BodyType":"Planet", "Latitude":5.0, "Longitude":6.0"#,
        SOL
    )));
    fixture.journal("Journal.2024-03-01T100000.01.log", &newer);
    fixture.status(LANDED, Some("Earth"));

    let engine = StateEngine::new(fixture.context(), Some("CMDR1"), None).expect("engine builds");

    assert_eq!(engine.mode(), Mode::Landed);
    let body = engine.body().expect("Earth is current");
    assert_eq!(body.radius, Some(EARTH_RADIUS));
    assert_eq!(engine.touchdown(), Some(LatLong::new(5.0, 6.0)));
    let earth = engine.system().and_then(|system| system.body("Earth")).expect("annotated");
    assert_eq!(earth.last_touchdown, Some(LatLong::new(5.0, 6.0)));
}

#[test]
fn shutdown_after_session_start_is_offline() {
    let fixture = Fixture::new();
    let mut lines = session_start("CMDR1");
    lines.extend([jump_to_sol(), line(r#""event":"Shutdown""#)]);
    fixture.journal("Journal.2024-03-01T100000.01.log", &lines);

    let engine = StateEngine::new(fixture.context(), None, None).expect("engine builds");
    assert!(engine.is_functional());
    assert_eq!(engine.mode(), Mode::Offline);
}

#[test]
fn no_journal_for_commander_is_offline_but_constructs() {
    let fixture = Fixture::new();
    fixture.journal("Journal.2024-03-01T100000.01.log", &session_start("CMDR2"));

    let engine = StateEngine::new(fixture.context(), Some("CMDR1"), None).expect("engine builds");
    assert!(!engine.is_functional());
    assert_eq!(engine.mode(), Mode::Offline);
    assert!(engine.snapshot().commander.is_none());
}

#[test]
fn missing_journal_folder_is_an_error() {
    let fixture = Fixture::new();
    let storage = fixture.storage.with_journal_root(fixture.journals.join("missing"));
    let context = SurveyContext::new(
        Settings {
            auto_load_enrichment: false,
            ..Settings::default()
        },
        storage,
    )
    .with_probe(Arc::new(StaticProbe(true)));

    assert!(matches!(
        StateEngine::new(context, None, None),
        Err(SurveyError::JournalDirNotFound(_))
    ));
}

struct ToggleProbe(Arc<AtomicBool>);

impl ProcessProbe for ToggleProbe {
    fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[test]
fn process_stop_goes_offline_and_restart_rebuilds() {
    let fixture = Fixture::new();
    let (_path, _) = near_earth(&fixture);
    let running = Arc::new(AtomicBool::new(true));
    let context = fixture
        .context()
        .with_probe(Arc::new(ToggleProbe(Arc::clone(&running))));
    let mut engine = StateEngine::new(context, None, None).expect("engine builds");
    assert_eq!(engine.mode(), Mode::Flying);

    running.store(false, Ordering::SeqCst);
    assert_eq!(engine.handle(EngineInput::ProcessTick).expect("tick"), Control::Continue);
    assert_eq!(engine.mode(), Mode::Offline);

    running.store(true, Ordering::SeqCst);
    assert_eq!(
        engine.handle(EngineInput::ProcessTick).expect("tick"),
        Control::Rebuild(None)
    );
}

#[test]
fn new_journal_file_requests_rebuild() {
    let fixture = Fixture::new();
    let (path, mut engine) = near_earth(&fixture);

    let same = engine
        .handle(EngineInput::JournalCreated(path))
        .expect("same file");
    assert_eq!(same, Control::Continue);

    let next = fixture.journals.join("Journal.2024-03-01T120000.01.log");
    let rotated = engine
        .handle(EngineInput::JournalCreated(next.clone()))
        .expect("new file");
    assert_eq!(rotated, Control::Rebuild(Some(next)));
}

#[test]
fn rotation_with_named_commander_follows_new_journal() {
    let fixture = Fixture::new();
    let mut old_lines = session_start("CMDR1");
    old_lines.extend([jump_to_sol(), line(r#""event":"Shutdown""#)]);
    let old_path = fixture.journal("Journal.2024-03-01T100000.01.log", &old_lines);
    age(&old_path, 3600);

    let mut engine = StateEngine::new(fixture.context(), Some("CMDR1"), None).expect("engine builds");
    assert_eq!(engine.mode(), Mode::Offline);

    // The game writes only the header until a commander is loaded.
    let new_path = fixture.journal(
        "Journal.2024-03-02T100000.01.log",
        &[line(r#""event":"Fileheader", "part":1, "Odyssey":true, "gameversion":"4.0""#)],
    );
    let control = engine
        .handle(EngineInput::JournalCreated(new_path.clone()))
        .expect("new file");
    assert_eq!(control, Control::Rebuild(Some(new_path.clone())));

    let mut engine = StateEngine::open(fixture.context(), &new_path, None).expect("engine rebuilds");
    assert_eq!(engine.journal().map(|live| live.path().to_path_buf()), Some(new_path.clone()));

    let restarted = StateEngine::new(fixture.context(), Some("CMDR1"), None).expect("engine builds");
    assert_eq!(
        restarted.journal().map(|live| live.path().to_path_buf()),
        Some(new_path.clone())
    );

    let session = session_start("CMDR1");
    for record in &session[1..] {
        append(&new_path, record);
    }
    append(
        &new_path,
        &line(&format!(
            r#""event":"Location", "StarSystem":"Achenar", "SystemAddress":{}, "StarPos":[67.5,-119.46875,24.84375]"#,
            ACHENAR
        )),
    );
    engine.handle(EngineInput::JournalChanged).expect("session applies");

    assert_eq!(engine.identity().map(|identity| identity.name.as_str()), Some("CMDR1"));
    assert_eq!(engine.location().map(|location| location.system.as_str()), Some("Achenar"));
    assert_ne!(engine.mode(), Mode::Offline);
}

#[test]
fn enrichment_result_lands_in_snapshot() {
    let fixture = Fixture::new();
    let mut lines = session_start("CMDR1");
    lines.push(jump_to_sol());
    fixture.journal("Journal.2024-03-01T100000.01.log", &lines);

    let enrichment_dir = fixture.storage.enrichment_dir();
    fs_err::create_dir_all(&enrichment_dir).expect("enrichment dir");
    fs_err::write(
        enrichment_dir.join("Sol.json"),
        r#"{ "system":"Sol", "body_count":10, "known_bio_bodies":["Earth"] }"#,
    )
    .expect("write enrichment");

    let context = SurveyContext::new(Settings::default(), fixture.storage.clone())
        .with_probe(Arc::new(StaticProbe(true)));
    let (tx, rx) = mpsc::channel();
    let mut engine = StateEngine::new(context, None, Some(tx)).expect("engine builds");

    let input = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("enrichment posted");
    assert!(matches!(&input, EngineInput::Enrichment { system, .. } if system == "Sol"));
    engine.handle(input).expect("enrichment applies");

    let enrichment = engine.snapshot().enrichment.expect("enrichment loaded");
    assert_eq!(enrichment.body_count, Some(10));
}

/// Answers every lookup immediately, counting calls.
struct CountingProvider {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingProvider {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EnrichmentProvider for CountingProvider {
    fn lookup(&self, system: &str) -> survey_core::Result<SystemEnrichment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SurveyError::io(
                "Enrichment service unavailable",
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
            ));
        }
        Ok(SystemEnrichment {
            system: system.to_string(),
            body_count: Some(1),
            ..SystemEnrichment::default()
        })
    }
}

fn next_enrichment(rx: &Receiver<EngineInput>) -> EngineInput {
    let input = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("enrichment posted");
    assert!(matches!(input, EngineInput::Enrichment { .. }));
    input
}

fn enrichment_system(input: &EngineInput) -> Option<&str> {
    match input {
        EngineInput::Enrichment { system, .. } => Some(system.as_str()),
        _ => None,
    }
}

#[test]
fn one_enrichment_lookup_in_flight_per_system() {
    let fixture = Fixture::new();
    let mut lines = session_start("CMDR1");
    lines.push(jump_to_sol());
    let path = fixture.journal("Journal.2024-03-01T100000.01.log", &lines);

    let provider = CountingProvider::new(false);
    let (tx, rx) = mpsc::channel();
    let mut engine = StateEngine::new(fixture.enriching_context(provider.clone()), None, Some(tx))
        .expect("engine builds");

    // Arriving again before the first result is handled asks for nothing.
    append(&path, &location_in_sol());
    engine.handle(EngineInput::JournalChanged).expect("location applies");

    let input = next_enrichment(&rx);
    assert_eq!(enrichment_system(&input), Some("Sol"));
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    assert_eq!(provider.calls(), 1);

    engine.handle(input).expect("enrichment applies");
    assert_eq!(
        engine.snapshot().enrichment.map(|enrichment| enrichment.system),
        Some("Sol".to_string())
    );
}

#[test]
fn enrichment_for_a_system_already_left_is_discarded() {
    let fixture = Fixture::new();
    let mut lines = session_start("CMDR1");
    lines.push(jump_to_sol());
    let path = fixture.journal("Journal.2024-03-01T100000.01.log", &lines);

    let provider = CountingProvider::new(false);
    let (tx, rx) = mpsc::channel();
    let mut engine = StateEngine::new(fixture.enriching_context(provider), None, Some(tx))
        .expect("engine builds");
    let sol = next_enrichment(&rx);
    assert_eq!(enrichment_system(&sol), Some("Sol"));

    append(&path, &jump_to_achenar());
    engine.handle(EngineInput::JournalChanged).expect("jump applies");
    assert_eq!(engine.location().map(|location| location.system.as_str()), Some("Achenar"));

    engine.handle(sol).expect("stale enrichment handled");
    assert_eq!(engine.snapshot().enrichment, None);

    let achenar = next_enrichment(&rx);
    assert_eq!(enrichment_system(&achenar), Some("Achenar"));
    engine.handle(achenar).expect("enrichment applies");
    assert_eq!(
        engine.snapshot().enrichment.map(|enrichment| enrichment.system),
        Some("Achenar".to_string())
    );
}

#[test]
fn failed_enrichment_is_not_retried() {
    let fixture = Fixture::new();
    let mut lines = session_start("CMDR1");
    lines.push(jump_to_sol());
    let path = fixture.journal("Journal.2024-03-01T100000.01.log", &lines);

    let provider = CountingProvider::new(true);
    let (tx, rx) = mpsc::channel();
    let mut engine = StateEngine::new(fixture.enriching_context(provider.clone()), None, Some(tx))
        .expect("engine builds");

    let failed = next_enrichment(&rx);
    assert!(matches!(&failed, EngineInput::Enrichment { result: Err(_), .. }));
    assert_eq!(engine.handle(failed).expect("failure handled"), Control::Continue);
    assert_eq!(engine.snapshot().enrichment, None);

    append(&path, &location_in_sol());
    engine.handle(EngineInput::JournalChanged).expect("location applies");
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    assert_eq!(provider.calls(), 1);
}
