//! Configuration schema for promptvault.

use crate::ConfigError;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Directory under the home directory holding user-level state.
pub const USER_STATE_DIR: &str = ".promptvault";

/// Root config for promptvault.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PromptVaultConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub defaults: GenerationDefaults,
    #[serde(default)]
    pub models: Vec<ModelEntry>,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl PromptVaultConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> PromptVaultConfigBuilder {
        PromptVaultConfigBuilder::new()
    }

    /// Selectable models, falling back to the built-in list when none are configured.
    pub fn model_catalog(&self) -> Vec<ModelEntry> {
        if !self.models.is_empty() {
            return self.models.clone();
        }
        BUILTIN_MODELS
            .iter()
            .map(|(name, default)| ModelEntry {
                name: (*name).to_string(),
                default: *default,
            })
            .collect()
    }

    /// Model used when a version config does not name one.
    ///
    /// The catalog entry flagged `default` wins, so this always agrees with
    /// `model_catalog()`; `defaults.model` applies when no entry is flagged.
    pub fn default_model(&self) -> String {
        self.model_catalog()
            .into_iter()
            .find(|entry| entry.default)
            .map(|entry| entry.name)
            .unwrap_or_else(|| self.defaults.model.clone())
    }
}

/// Models offered when the config does not list any.
const BUILTIN_MODELS: &[(&str, bool)] = &[
    ("gpt-5.2", true),
    ("gpt-5.1", false),
    ("gpt-5", false),
    ("gpt-4o", false),
    ("gpt-4o-mini", false),
];

/// Builder for assembling a `PromptVaultConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct PromptVaultConfigBuilder {
    config: PromptVaultConfig,
}

impl PromptVaultConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: PromptVaultConfig::default(),
        }
    }

    /// Replace the storage configuration.
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    /// Replace the provider configuration.
    pub fn provider(mut self, provider: ProviderConfig) -> Self {
        self.config.provider = provider;
        self
    }

    /// Replace the generation defaults.
    pub fn defaults(mut self, defaults: GenerationDefaults) -> Self {
        self.config.defaults = defaults;
        self
    }

    /// Replace the model catalog.
    pub fn models(mut self, models: Vec<ModelEntry>) -> Self {
        self.config.models = models;
        self
    }

    /// Replace the execution settings.
    pub fn execution(mut self, execution: ExecutionConfig) -> Self {
        self.config.execution = execution;
        self
    }

    /// Finalize and return the built `PromptVaultConfig`.
    pub fn build(self) -> PromptVaultConfig {
        self.config
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local store, discarded on exit.
    Memory,
    /// Append-only JSONL event log on disk.
    #[default]
    Jsonl,
}

/// Where templates, versions, and executions are persisted.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub path: Option<String>,
}

impl StorageConfig {
    /// Directory for the JSONL backend: explicit path or `~/.promptvault/catalog`.
    pub fn resolved_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.path {
            return Ok(PathBuf::from(path));
        }
        UserDirs::new()
            .map(|dirs| dirs.home_dir().join(USER_STATE_DIR).join("catalog"))
            .ok_or(ConfigError::UnresolvedStoragePath)
    }
}

/// Provider kinds understood by the CLI.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions endpoint.
    #[default]
    OpenAi,
}

/// Text-generation provider connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_ms() -> u64 {
    60_000
}

/// Values applied when a version's model config leaves a field unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationDefaults {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Hard ceiling applied to every request.
    #[serde(default = "default_max_tokens_cap")]
    pub max_tokens_cap: u32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_tokens_cap: default_max_tokens_cap(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_max_tokens_cap() -> u32 {
    4096
}

/// Entry in the selectable model catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelEntry {
    pub name: String,
    #[serde(default)]
    pub default: bool,
}

/// Execution bookkeeping settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Attempts at minting a version before giving up on write conflicts.
    #[serde(default = "default_version_retry_limit")]
    pub version_retry_limit: u32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            version_retry_limit: default_version_retry_limit(),
        }
    }
}

fn default_version_retry_limit() -> u32 {
    3
}
