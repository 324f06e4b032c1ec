//! survey-daemon: single owner of the derived game state.
//!
//! ## Subcommands
//!
//! - `watch`: follow the live journal, print engine events as JSON lines
//! - `status`: reconstruct state from history once and print a snapshot
//!
//! Watcher, process ticker and enrichment threads only feed the input queue;
//! this thread drains it into the engine. A new journal file or a restarted
//! game tears the engine down and builds a fresh one.

mod logging;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

use survey_core::watch;
use survey_core::{
    Control, EngineEvent, EngineInput, Result, Settings, StateEngine, StorageConfig, SurveyContext,
    SurveyError,
};

#[derive(Parser)]
#[command(name = "survey-daemon")]
#[command(about = "Journal state engine for exploration surveys")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the live journal and print engine events as JSON lines
    Watch {
        /// Commander to follow (defaults to settings, then newest journal)
        #[arg(long)]
        commander: Option<String>,
    },

    /// Reconstruct state from journal history and print it as JSON
    Status {
        /// Commander to report on
        #[arg(long)]
        commander: Option<String>,
    },
}

fn main() {
    let storage = StorageConfig::default();
    let _logging_guard = logging::init(&storage.logs_dir());
    let cli = Cli::parse();

    let settings = Settings::load_or_default(&storage.settings_file());
    let context = SurveyContext::new(settings, storage);

    let result = match cli.command {
        Commands::Watch { commander } => {
            let commander = commander.or_else(|| context.settings.preferred_commander.clone());
            run_watch(context, commander)
        }
        Commands::Status { commander } => {
            let commander = commander.or_else(|| context.settings.preferred_commander.clone());
            run_status(context, commander)
        }
    };

    if let Err(err) = result {
        error!(error = %err, "survey-daemon failed");
        std::process::exit(1);
    }
}

fn run_status(context: SurveyContext, commander: Option<String>) -> Result<()> {
    let engine = StateEngine::new(context, commander.as_deref(), None)?;
    let snapshot = serde_json::to_string_pretty(&engine.snapshot())
        .map_err(|err| SurveyError::json("Failed to serialize snapshot", err))?;
    println!("{}", snapshot);
    Ok(())
}

fn run_watch(context: SurveyContext, commander: Option<String>) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let _watcher = watch::spawn_watcher(&context.storage, tx.clone())?;
    spawn_process_ticker(
        tx.clone(),
        Duration::from_secs(context.settings.process_poll_secs.max(1)),
    );

    let mut next_journal: Option<PathBuf> = None;
    loop {
        let mut engine = match next_journal.take() {
            Some(path) => StateEngine::open(context.clone(), &path, Some(tx.clone()))?,
            None => StateEngine::new(context.clone(), commander.as_deref(), Some(tx.clone()))?,
        };
        spawn_event_printer(engine.subscribe());
        engine.force_update();

        match drive(&mut engine, &rx)? {
            Some(journal) => next_journal = journal,
            None => {
                info!("Input queue closed; exiting");
                return Ok(());
            }
        }
        info!("Rebuilding engine");
    }
}

/// Feeds inputs until the engine asks to be rebuilt (`Some`, carrying the
/// journal to reopen on) or the queue closes (`None`).
fn drive(engine: &mut StateEngine, rx: &Receiver<EngineInput>) -> Result<Option<Option<PathBuf>>> {
    for input in rx.iter() {
        match engine.handle(input) {
            Ok(Control::Continue) => {}
            Ok(Control::Rebuild(journal)) => return Ok(Some(journal)),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(error = %err, "Engine input failed; rebuilding");
                return Ok(Some(None));
            }
        }
    }
    Ok(None)
}

fn spawn_process_ticker(tx: Sender<EngineInput>, interval: Duration) {
    thread::spawn(move || loop {
        thread::sleep(interval);
        if tx.send(EngineInput::ProcessTick).is_err() {
            break;
        }
    });
}

/// Prints events until the engine that owns the sender is dropped.
fn spawn_event_printer(events: Receiver<EngineEvent>) {
    thread::spawn(move || {
        for event in events {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(err) => warn!(error = %err, "Failed to serialize engine event"),
            }
        }
    });
}
