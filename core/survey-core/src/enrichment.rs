//! Third-party system metadata, fetched off the engine thread.
//!
//! The engine never blocks on a lookup. It hands the system name to
//! [`spawn_lookup`], which runs the provider on a worker thread and posts the
//! result back into the engine's input queue.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tracing::debug;

use crate::engine::EngineInput;
use crate::error::{Result, SurveyError};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemEnrichment {
    pub system: String,
    #[serde(default)]
    pub body_count: Option<u32>,
    #[serde(default)]
    pub known_bio_bodies: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

pub trait EnrichmentProvider: Send + Sync {
    fn lookup(&self, system: &str) -> Result<SystemEnrichment>;
}

/// Reads enrichment from `<dir>/<system>.json` (by default
/// `~/.survey/enrichment/`). Missing files yield an empty result.
pub struct DirectoryEnrichment {
    dir: PathBuf,
}

impl DirectoryEnrichment {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl EnrichmentProvider for DirectoryEnrichment {
    fn lookup(&self, system: &str) -> Result<SystemEnrichment> {
        let path = self.dir.join(format!("{}.json", system));
        if !path.exists() {
            return Ok(SystemEnrichment {
                system: system.to_string(),
                ..SystemEnrichment::default()
            });
        }
        let content = fs_err::read_to_string(&path)
            .map_err(|err| SurveyError::io("Failed to read enrichment", err))?;
        serde_json::from_str(&content)
            .map_err(|err| SurveyError::json("Failed to parse enrichment", err))
    }
}

/// Runs `provider.lookup(system)` on a worker thread and posts the outcome.
pub fn spawn_lookup(provider: Arc<dyn EnrichmentProvider>, system: String, tx: Sender<EngineInput>) {
    std::thread::spawn(move || {
        debug!(system = %system, "Enrichment lookup started");
        let result = provider.lookup(&system).map_err(|err| err.to_string());
        let _ = tx.send(EngineInput::Enrichment { system, result });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_provider_reads_system_file() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        fs_err::write(
            temp_dir.path().join("Sol.json"),
            r#"{ "system":"Sol", "body_count":10, "known_bio_bodies":["Earth"] }"#,
        )
        .expect("write enrichment");

        let provider = DirectoryEnrichment::new(temp_dir.path().to_path_buf());
        let sol = provider.lookup("Sol").expect("lookup");
        assert_eq!(sol.body_count, Some(10));

        let empty = provider.lookup("Achenar").expect("lookup missing");
        assert_eq!(empty.system, "Achenar");
        assert!(empty.known_bio_bodies.is_empty());
    }
}
