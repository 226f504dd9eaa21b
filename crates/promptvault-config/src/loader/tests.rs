//! Tests for layered configuration loading.

use super::*;
use crate::{ModelEntry, ProviderKind};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

/// Options that only look at the given cwd plus explicit system/user files.
fn isolated_options(cwd: &Path, system: Option<PathBuf>, user: Option<PathBuf>) -> LayeredConfigOptions {
    let mut options = LayeredConfigOptions::new(cwd);
    options.system_config_path = system;
    options.user_config_path = user;
    options
}

/// Verify that a minimal config parses with defaults.
#[test]
fn parse_minimal_config() {
    let config = PromptVaultConfig::load_from_str("{ storage: { backend: \"memory\" } }")
        .expect("config");
    assert_eq!(config.defaults.model, "gpt-4o");
    assert_eq!(config.defaults.temperature, 0.7);
    assert_eq!(config.defaults.max_tokens, 2000);
    assert_eq!(config.defaults.max_tokens_cap, 4096);
    assert_eq!(config.provider.kind, ProviderKind::OpenAi);
    assert_eq!(config.provider.api_key_env, "OPENAI_API_KEY");
    assert_eq!(config.execution.version_retry_limit, 3);
}

/// Reject unexpected top-level config keys.
#[test]
fn rejects_unknown_top_level_key() {
    let err = PromptVaultConfig::load_from_str("{ unexpected: true }").unwrap_err();
    assert!(format!("{err}").contains("unknown key"));
}

/// Reject values of the wrong type with the offending path.
#[test]
fn rejects_wrong_types_with_path() {
    let err = PromptVaultConfig::load_from_str("{ provider: { timeout_ms: \"soon\" } }")
        .unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("provider.timeout_ms"), "{msg}");
}

/// Reject an unknown storage backend.
#[test]
fn rejects_unknown_backend() {
    let err = PromptVaultConfig::load_from_str("{ storage: { backend: \"sqlite\" } }")
        .unwrap_err();
    assert!(format!("{err}").contains("storage.backend"));
}

/// Temperatures outside the provider range are rejected after decoding.
#[test]
fn rejects_out_of_range_temperature() {
    let err = PromptVaultConfig::load_from_str(
        "{ storage: { backend: \"memory\" }, defaults: { temperature: 3.5 } }",
    )
    .unwrap_err();
    assert!(format!("{err}").contains("defaults.temperature"));
}

/// Only one catalog entry may be the default.
#[test]
fn rejects_multiple_default_models() {
    let err = PromptVaultConfig::load_from_str(
        "{ storage: { backend: \"memory\" }, models: [ { name: \"a\", default: true }, { name: \"b\", default: true } ] }",
    )
    .unwrap_err();
    assert!(format!("{err}").contains("at most one model"));
}

/// Without configured models the built-in catalog is offered.
#[test]
fn model_catalog_falls_back_to_builtin_list() {
    let config = PromptVaultConfig::load_from_str("{ storage: { backend: \"memory\" } }")
        .expect("config");
    let catalog = config.model_catalog();
    assert_eq!(catalog.len(), 5);
    assert_eq!(
        catalog[0],
        ModelEntry {
            name: "gpt-5.2".to_string(),
            default: true
        }
    );
    assert_eq!(config.default_model(), "gpt-5.2");

    let config = PromptVaultConfig::load_from_str(
        "{ storage: { backend: \"memory\" }, models: [ { name: \"local\" }, { name: \"big\", default: true } ] }",
    )
    .expect("config");
    assert_eq!(config.model_catalog().len(), 2);
    assert_eq!(config.default_model(), "big");
}

/// Ensure cwd config takes precedence over project and user config.
#[test]
fn layered_config_prefers_cwd_over_project_and_user() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let project_root = root.join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    let cwd = project_root.join("subdir");
    fs::create_dir_all(&cwd).expect("cwd");

    let system_config = root.join("system.json5");
    write_json5(
        &system_config,
        "{ storage: { backend: \"memory\" }, defaults: { model: \"system\", max_tokens: 100 } }",
    );
    let user_config = root.join("user.json5");
    write_json5(&user_config, "{ defaults: { model: \"user\" } }");
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        "{ defaults: { model: \"project\" } }",
    );
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        "{ defaults: { model: \"cwd\" } }",
    );

    let options = isolated_options(&cwd, Some(system_config), Some(user_config));
    let layered = PromptVaultConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.defaults.model, "cwd".to_string());
    assert_eq!(layered.config.defaults.max_tokens, 100);
    let sources: Vec<_> = layered.layers.iter().map(|layer| layer.source).collect();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::System,
            ConfigLayerSource::User,
            ConfigLayerSource::Project,
            ConfigLayerSource::Cwd,
        ]
    );
}

/// Runtime overrides are applied last.
#[test]
fn runtime_override_wins() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();

    let system_config = root.join("system.json5");
    write_json5(
        &system_config,
        "{ storage: { backend: \"memory\" }, provider: { timeout_ms: 1000 } }",
    );
    let runtime_config = root.join("runtime.json5");
    write_json5(&runtime_config, "{ provider: { timeout_ms: 5 } }");

    let options = isolated_options(root, Some(system_config), None).with_runtime_path(&runtime_config);
    let layered = PromptVaultConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.provider.timeout_ms, 5);
    assert_eq!(layered.layers.last().map(|layer| layer.source), Some(ConfigLayerSource::Runtime));
}

/// A `null` in a higher layer resets a lower-layer value to its default.
#[test]
fn null_in_higher_layer_restores_default() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();

    let system_config = root.join("system.json5");
    write_json5(
        &system_config,
        "{ storage: { backend: \"jsonl\", path: \"/srv/promptvault\" }, defaults: { model: \"pinned\" } }",
    );
    let runtime_config = root.join("runtime.json5");
    write_json5(
        &runtime_config,
        "{ storage: { backend: \"memory\" }, defaults: { model: null } }",
    );

    let options = isolated_options(root, Some(system_config), None).with_runtime_path(&runtime_config);
    let layered = PromptVaultConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.defaults.model, "gpt-4o");
    assert_eq!(layered.config.storage.path, Some("/srv/promptvault".to_string()));
}

/// A missing runtime override file is an error, unlike optional layers.
#[test]
fn missing_runtime_layer_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let options = isolated_options(temp.path(), None, None)
        .with_runtime_path(temp.path().join("absent.json5"));
    let err = PromptVaultConfig::load_layered_with_options(options).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed { .. }));
}

/// Layer schema errors name the layer they came from.
#[test]
fn layer_errors_include_layer_label() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let user_config = root.join("user.json5");
    write_json5(&user_config, "{ execution: { retries: 2 } }");

    let options = isolated_options(root, None, Some(user_config));
    let err = PromptVaultConfig::load_layered_with_options(options).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("user("), "{msg}");
    assert!(msg.contains("execution.retries"), "{msg}");
}

/// The default model always matches the catalog entry flagged default.
#[test]
fn default_model_agrees_with_catalog() {
    for contents in [
        "{ storage: { backend: \"memory\" } }",
        "{ storage: { backend: \"memory\" }, defaults: { model: \"pinned\" } }",
        "{ storage: { backend: \"memory\" }, models: [ { name: \"a\" }, { name: \"b\", default: true } ] }",
    ] {
        let config = PromptVaultConfig::load_from_str(contents).expect("config");
        let flagged: Vec<_> = config
            .model_catalog()
            .into_iter()
            .filter(|entry| entry.default)
            .map(|entry| entry.name)
            .collect();
        assert_eq!(flagged, vec![config.default_model()], "{contents}");
    }

    let config = PromptVaultConfig::load_from_str(
        "{ storage: { backend: \"memory\" }, defaults: { model: \"pinned\" }, models: [ { name: \"a\" } ] }",
    )
    .expect("config");
    assert_eq!(config.default_model(), "pinned");
}
