//! Everything an engine needs from its surroundings, built once per process.

use std::sync::Arc;

use crate::annotations::{AnnotationStore, JsonAnnotationStore};
use crate::enrichment::{DirectoryEnrichment, EnrichmentProvider};
use crate::journal::ChainNavigator;
use crate::process::{ProcessProbe, SysinfoProbe};
use crate::settings::Settings;
use crate::storage::StorageConfig;

#[derive(Clone)]
pub struct SurveyContext {
    pub settings: Settings,
    pub storage: StorageConfig,
    pub probe: Arc<dyn ProcessProbe>,
    pub enrichment: Option<Arc<dyn EnrichmentProvider>>,
    pub store: Arc<dyn AnnotationStore>,
}

impl SurveyContext {
    /// Production wiring: sysinfo probe, JSON store, directory enrichment.
    /// A `journal_folder` in settings overrides the storage default.
    pub fn new(settings: Settings, storage: StorageConfig) -> Self {
        let storage = match &settings.journal_folder {
            Some(folder) => storage.with_journal_root(folder.clone()),
            None => storage,
        };
        let enrichment: Option<Arc<dyn EnrichmentProvider>> = if settings.auto_load_enrichment {
            Some(Arc::new(DirectoryEnrichment::new(storage.enrichment_dir())))
        } else {
            None
        };

        Self {
            probe: Arc::new(SysinfoProbe::new(&settings.process_name)),
            store: Arc::new(JsonAnnotationStore::new(storage.clone())),
            enrichment,
            settings,
            storage,
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn ProcessProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_enrichment(mut self, provider: Option<Arc<dyn EnrichmentProvider>>) -> Self {
        self.enrichment = provider;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn AnnotationStore>) -> Self {
        self.store = store;
        self
    }

    pub fn navigator(&self) -> ChainNavigator {
        ChainNavigator::new(
            self.storage.journal_root().to_path_buf(),
            self.settings.max_deep_files,
        )
    }
}
