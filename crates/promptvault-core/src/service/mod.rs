//! Prompt service: catalog management, version bookkeeping, and execution.

mod catalog;
mod execute;

pub use execute::shape_request;

use crate::error::CoreError;
use log::{debug, info};
use parking_lot::Mutex;
use promptvault_config::{PromptVaultConfig, StorageBackend, StorageConfig};
use promptvault_protocol::{
    EventMsg, EventPayload, EventSink, Execution, FragmentId, ModelConfig, TemplateId,
    TextGenerator, Version,
};
use promptvault_store::{CatalogStore, JsonlCatalogStore, MemoryCatalogStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Input for a new catalog fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFragment {
    pub label: String,
    pub category: String,
    /// Persisted string form: a literal or `(a|b|c)`.
    pub content: String,
}

/// Partial fragment edit; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FragmentUpdate {
    pub label: Option<String>,
    pub category: Option<String>,
    pub content: Option<String>,
}

/// Input for a new template. Its text and config become version 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub description: Option<String>,
    pub template_text: String,
    pub model_config: ModelConfig,
    pub fragment_ids: BTreeSet<FragmentId>,
}

/// Run a template with the author's current text, config, and values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub template_id: TemplateId,
    pub template_text: String,
    pub model_config: ModelConfig,
    pub variables: BTreeMap<String, String>,
}

/// Result of a successful execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Version the execution belongs to.
    pub version: Version,
    /// True when this call minted `version`.
    pub version_created: bool,
    /// Stored execution record.
    pub execution: Execution,
}

/// Engine facade over a catalog store and a text generator.
pub struct PromptService {
    config: Arc<PromptVaultConfig>,
    store: Arc<dyn CatalogStore>,
    generator: Option<Arc<dyn TextGenerator>>,
    event_sink: Option<Arc<dyn EventSink>>,
    /// Serializes version minting per template.
    template_locks: Mutex<HashMap<TemplateId, Arc<Mutex<()>>>>,
}

impl PromptService {
    /// Create a service without a generator; [`PromptService::execute`]
    /// fails until one is attached.
    pub fn new(config: PromptVaultConfig, store: Arc<dyn CatalogStore>) -> Self {
        info!(
            "initializing prompt service (backend={:?}, retry_limit={})",
            config.storage.backend, config.execution.version_retry_limit
        );
        Self {
            config: Arc::new(config),
            store,
            generator: None,
            event_sink: None,
            template_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Attach the text generator used by executions.
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        debug!("attaching text generator (name={})", generator.name());
        self.generator = Some(generator);
        self
    }

    /// Attach an observer for service events.
    pub fn with_event_sink(mut self, event_sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(event_sink);
        self
    }

    pub fn config(&self) -> &PromptVaultConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn CatalogStore> {
        self.store.clone()
    }

    fn emit(&self, payload: EventPayload) {
        if let Some(sink) = &self.event_sink {
            sink.emit(EventMsg::new(payload));
        }
    }

    fn template_lock(&self, template_id: TemplateId) -> Arc<Mutex<()>> {
        self.template_locks
            .lock()
            .entry(template_id)
            .or_default()
            .clone()
    }

    fn forget_template_lock(&self, template_id: TemplateId) {
        self.template_locks.lock().remove(&template_id);
    }
}

/// Open the catalog store selected by the storage config.
pub fn open_store(storage: &StorageConfig) -> Result<Arc<dyn CatalogStore>, CoreError> {
    match storage.backend {
        StorageBackend::Memory => {
            info!("using in-memory catalog store");
            Ok(Arc::new(MemoryCatalogStore::new()))
        }
        StorageBackend::Jsonl => {
            let root = storage.resolved_path()?;
            Ok(Arc::new(JsonlCatalogStore::open(root)?))
        }
    }
}
