//! Filesystem notifications for the journal folder.
//!
//! One non-recursive watch covers everything the game writes: journal files,
//! `Status.json` and `NavRoute.json`. Events are mapped to [`EngineInput`]s
//! on the watcher thread; the engine thread does the actual reading.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::engine::EngineInput;
use crate::error::{Result, SurveyError};
use crate::storage::{StorageConfig, NAV_ROUTE_FILE_NAME, STATUS_FILE_NAME};
use crate::telemetry::{read_snapshot, NavRoute, Status};

const WATCH_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Maps one notification to the inputs it implies.
pub fn classify(event: &Event) -> Vec<EngineInput> {
    let created = matches!(event.kind, EventKind::Create(_));
    if !created && !matches!(event.kind, EventKind::Modify(_)) {
        return Vec::new();
    }

    let mut inputs = Vec::new();
    for path in &event.paths {
        if StorageConfig::is_journal_file(path) {
            inputs.push(if created {
                EngineInput::JournalCreated(path.clone())
            } else {
                EngineInput::JournalChanged
            });
            continue;
        }

        match file_name(path) {
            Some(STATUS_FILE_NAME) => match read_snapshot::<Status>(path) {
                Ok(Some(status)) => inputs.push(EngineInput::Telemetry(status)),
                Ok(None) => debug!("Status snapshot unreadable; skipped"),
                Err(err) => warn!(error = %err, "Failed to read status snapshot"),
            },
            Some(NAV_ROUTE_FILE_NAME) => match read_snapshot::<NavRoute>(path) {
                Ok(Some(route)) => inputs.push(EngineInput::Route(route)),
                Ok(None) => debug!("Route snapshot unreadable; skipped"),
                Err(err) => warn!(error = %err, "Failed to read route snapshot"),
            },
            _ => {}
        }
    }
    inputs
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

/// Watches the journal folder and forwards classified inputs into `tx`.
///
/// The watcher is created here so setup failures reach the caller. The
/// returned thread ends when the engine side of `tx` hangs up.
pub fn spawn_watcher(storage: &StorageConfig, tx: Sender<EngineInput>) -> Result<JoinHandle<()>> {
    let dir = storage.journal_root().to_path_buf();
    if !dir.is_dir() {
        return Err(SurveyError::JournalDirNotFound(dir));
    }

    let (event_tx, event_rx) = mpsc::channel();
    let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            let _ = event_tx.send(event);
        }
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!(path = %dir.display(), "Watching journal folder");

    Ok(std::thread::spawn(move || {
        // Dropping the watcher stops notifications, so it lives on this thread.
        let _watcher = watcher;
        loop {
            match event_rx.recv_timeout(WATCH_IDLE_TIMEOUT) {
                Ok(event) => {
                    for input in classify(&event) {
                        if tx.send(input).is_err() {
                            debug!("Engine queue closed; watcher exiting");
                            return;
                        }
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    }))
}
