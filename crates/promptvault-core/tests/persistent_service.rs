//! Service behaviour over the JSONL store across restarts.

use pretty_assertions::assert_eq;
use promptvault_config::{PromptVaultConfig, StorageBackend, StorageConfig};
use promptvault_core::{ExecuteRequest, NewTemplate, PromptService, open_store};
use promptvault_store::CatalogStore;
use promptvault_test_utils::{FixedGenerator, model_config};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tempfile::tempdir;

fn config(path: &std::path::Path) -> PromptVaultConfig {
    PromptVaultConfig::builder()
        .storage(StorageConfig {
            backend: StorageBackend::Jsonl,
            path: Some(path.display().to_string()),
        })
        .build()
}

fn service(config: &PromptVaultConfig) -> PromptService {
    let store = open_store(&config.storage).expect("store");
    PromptService::new(config.clone(), store).with_generator(Arc::new(FixedGenerator::new("ok")))
}

#[tokio::test]
async fn history_and_version_counter_survive_restart() {
    let temp = tempdir().expect("tempdir");
    let config = config(temp.path());

    let template_id = {
        let service = service(&config);
        let (template, _) = service
            .create_template(NewTemplate {
                name: "persisted".to_string(),
                description: Some("kept on disk".to_string()),
                template_text: "Hi {{name}}".to_string(),
                model_config: model_config("gpt-4o", 0.7),
                fragment_ids: BTreeSet::new(),
            })
            .expect("create");
        service
            .execute(ExecuteRequest {
                template_id: template.id,
                template_text: "Hi {{name}}".to_string(),
                model_config: model_config("gpt-4o", 0.7),
                variables: BTreeMap::from([("name".to_string(), "Ada".to_string())]),
            })
            .await
            .expect("execute");
        template.id
    };

    let service = service(&config);
    assert_eq!(
        service.last_variables(template_id).expect("last"),
        BTreeMap::from([("name".to_string(), "Ada".to_string())])
    );
    let outcome = service
        .execute(ExecuteRequest {
            template_id,
            template_text: "Hello {{name}}".to_string(),
            model_config: model_config("gpt-4o", 0.7),
            variables: BTreeMap::from([("name".to_string(), "Bo".to_string())]),
        })
        .await
        .expect("execute after restart");
    assert_eq!(outcome.version.version_number, 2);
    assert_eq!(outcome.execution.rendered_prompt, "Hello Bo");

    let history = service.history(template_id).expect("history");
    let shape: Vec<_> = history
        .iter()
        .map(|entry| (entry.version.version_number, entry.executions.len()))
        .collect();
    assert_eq!(shape, vec![(2, 1), (1, 1)]);
}

#[test]
fn memory_backend_needs_no_path() {
    let config = PromptVaultConfig::builder()
        .storage(StorageConfig {
            backend: StorageBackend::Memory,
            path: None,
        })
        .build();
    let store = open_store(&config.storage).expect("store");
    assert!(store.list_templates().expect("list").is_empty());
}
