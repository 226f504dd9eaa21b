//! Behaviour shared by every catalog store backend.

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use promptvault_protocol::{
    Execution, Fragment, FragmentContent, ModelConfig, Template, TemplateId, Version, VersionId,
};
use promptvault_store::{
    CatalogStore, EntityKind, JsonlCatalogStore, MemoryCatalogStore, StoreError,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;
use uuid::Uuid;

fn fragment(label: &str, content: &str, age_secs: i64) -> Fragment {
    Fragment {
        id: Uuid::new_v4(),
        label: label.to_string(),
        category: "general".to_string(),
        content: FragmentContent::parse(content),
        created_at: Utc::now() - Duration::seconds(age_secs),
    }
}

fn template(name: &str) -> Template {
    let now = Utc::now();
    Template {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        fragment_refs: BTreeSet::new(),
        created_at: now,
        updated_at: now,
    }
}

fn version(template_id: TemplateId, number: u32, text: &str) -> Version {
    Version {
        id: Uuid::new_v4(),
        template_id,
        version_number: number,
        template_text: text.to_string(),
        model_config: ModelConfig::new("gpt-4o", 0.7),
        created_at: Utc::now(),
    }
}

fn execution(version_id: VersionId, prompt: &str, age_secs: i64) -> Execution {
    Execution {
        id: Uuid::new_v4(),
        version_id,
        variables_used: BTreeMap::new(),
        rendered_prompt: prompt.to_string(),
        ai_output: format!("out: {prompt}"),
        latency_ms: 5,
        tokens_total: 3,
        created_at: Utc::now() - Duration::seconds(age_secs),
    }
}

fn fragments_round_trip(store: &dyn CatalogStore) {
    let older = fragment("Audience", "developers", 10);
    let newer = fragment("Tone", "(formal|casual)", 0);
    store.save_fragment(&older).expect("older");
    store.save_fragment(&newer).expect("newer");

    let listed: Vec<_> = store
        .list_fragments()
        .expect("list")
        .into_iter()
        .map(|f| f.label)
        .collect();
    assert_eq!(listed, vec!["Tone".to_string(), "Audience".to_string()]);

    let updated = Fragment {
        content: FragmentContent::parse("(formal|casual|playful)"),
        ..newer.clone()
    };
    store.save_fragment(&updated).expect("update");
    assert_eq!(
        store
            .get_fragment(newer.id)
            .expect("get")
            .and_then(|f| f.options().map(|o| o.len())),
        Some(3)
    );

    assert!(store.delete_fragment(older.id).expect("delete"));
    assert!(!store.delete_fragment(older.id).expect("delete again"));
}

fn dangling_fragment_refs_are_skipped(store: &dyn CatalogStore) {
    let kept = fragment("Tone", "formal", 0);
    let dropped = fragment("Audience", "devs", 0);
    store.save_fragment(&kept).expect("kept");
    store.save_fragment(&dropped).expect("dropped");
    let mut tpl = template("linked");
    tpl.fragment_refs = BTreeSet::from([kept.id, dropped.id]);
    store.save_template(&tpl).expect("template");

    store.delete_fragment(dropped.id).expect("delete");
    let fragments = store.template_fragments(tpl.id).expect("fragments");
    assert_eq!(fragments, vec![kept]);

    let err = store.template_fragments(Uuid::new_v4()).unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            kind: EntityKind::Template,
            ..
        }
    ));
}

fn versions_are_contiguous(store: &dyn CatalogStore) {
    let tpl = template("versions");
    store.save_template(&tpl).expect("template");
    assert_eq!(store.latest_version(tpl.id).expect("latest"), None);

    let orphan = version(Uuid::new_v4(), 1, "x");
    assert!(matches!(
        store.insert_version(&orphan).unwrap_err(),
        StoreError::NotFound {
            kind: EntityKind::Template,
            ..
        }
    ));

    let v1 = version(tpl.id, 1, "one");
    let v2 = version(tpl.id, 2, "two");
    store.insert_version(&v1).expect("v1");
    store.insert_version(&v2).expect("v2");
    let gap = version(tpl.id, 4, "four");
    assert!(matches!(
        store.insert_version(&gap).unwrap_err(),
        StoreError::VersionConflict {
            version_number: 4,
            ..
        }
    ));

    let numbers: Vec<_> = store
        .list_versions(tpl.id)
        .expect("list")
        .iter()
        .map(|v| v.version_number)
        .collect();
    assert_eq!(numbers, vec![2, 1]);
    assert_eq!(store.latest_version(tpl.id).expect("latest"), Some(v2.clone()));
    assert_eq!(store.get_version(v1.id).expect("get"), Some(v1));
}

fn history_and_bulk_delete(store: &dyn CatalogStore) {
    let tpl = template("history");
    store.save_template(&tpl).expect("template");
    let v1 = version(tpl.id, 1, "one");
    let v2 = version(tpl.id, 2, "two");
    store.insert_version(&v1).expect("v1");
    store.insert_version(&v2).expect("v2");

    let old = execution(v1.id, "old", 60);
    let mid = execution(v2.id, "mid", 30);
    let new = execution(v2.id, "new", 0);
    for run in [&old, &new, &mid] {
        store.insert_execution(run).expect("execution");
    }
    let missing_parent = execution(Uuid::new_v4(), "x", 0);
    assert!(matches!(
        store.insert_execution(&missing_parent).unwrap_err(),
        StoreError::NotFound {
            kind: EntityKind::Version,
            ..
        }
    ));

    let history = store.history(tpl.id).expect("history");
    assert_eq!(history[0].version.version_number, 2);
    let prompts: Vec<_> = history[0]
        .executions
        .iter()
        .map(|e| e.rendered_prompt.as_str())
        .collect();
    assert_eq!(prompts, vec!["new", "mid"]);
    assert_eq!(history[1].executions, vec![old.clone()]);
    assert_eq!(store.latest_execution(tpl.id).expect("latest"), Some(new.clone()));

    let removed = store
        .delete_executions(&[new.id, old.id, Uuid::new_v4(), new.id])
        .expect("delete");
    assert_eq!(removed, 2);
    let history = store.history(tpl.id).expect("history");
    assert_eq!(history[0].executions, vec![mid]);
    assert!(history[1].executions.is_empty());
}

fn concurrent_version_inserts_have_one_winner(store: Arc<dyn CatalogStore>) {
    let tpl = template("race");
    store.save_template(&tpl).expect("template");
    store.insert_version(&version(tpl.id, 1, "base")).expect("v1");

    let handles: Vec<_> = (0..8)
        .map(|idx| {
            let store = Arc::clone(&store);
            let candidate = version(tpl.id, 2, &format!("edit {idx}"));
            thread::spawn(move || store.insert_version(&candidate).is_ok())
        })
        .collect();
    let winners = handles
        .into_iter()
        .map(|handle| handle.join().expect("join"))
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(store.list_versions(tpl.id).expect("list").len(), 2);
}

fn run_contract(make: impl Fn() -> Arc<dyn CatalogStore>) {
    fragments_round_trip(make().as_ref());
    dangling_fragment_refs_are_skipped(make().as_ref());
    versions_are_contiguous(make().as_ref());
    history_and_bulk_delete(make().as_ref());
    concurrent_version_inserts_have_one_winner(make());
}

#[test]
fn memory_store_contract() {
    run_contract(|| Arc::new(MemoryCatalogStore::new()));
}

#[test]
fn jsonl_store_contract() {
    let temp = tempdir().expect("tempdir");
    let counter = std::cell::Cell::new(0);
    run_contract(|| {
        counter.set(counter.get() + 1);
        let root = temp.path().join(format!("store-{}", counter.get()));
        Arc::new(JsonlCatalogStore::open(root).expect("store"))
    });
}

#[test]
fn jsonl_handles_on_one_log_share_version_numbers() {
    let temp = tempdir().expect("tempdir");
    let first = JsonlCatalogStore::open(temp.path()).expect("first");
    let tpl = template("shared");
    first.save_template(&tpl).expect("template");
    first.insert_version(&version(tpl.id, 1, "base")).expect("v1");

    let second = JsonlCatalogStore::open(temp.path()).expect("second");
    first
        .insert_version(&version(tpl.id, 2, "from first"))
        .expect("first v2");
    let err = second
        .insert_version(&version(tpl.id, 2, "from second"))
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::VersionConflict {
            version_number: 2,
            ..
        }
    ));

    // The failed write still caught the second handle up.
    let latest = second.latest_version(tpl.id).expect("latest").expect("some");
    assert_eq!(latest.template_text, "from first");
    second
        .insert_version(&version(tpl.id, 3, "from second"))
        .expect("second v3");

    let reopened = JsonlCatalogStore::open(temp.path()).expect("reopen");
    let numbers: Vec<_> = reopened
        .list_versions(tpl.id)
        .expect("versions")
        .into_iter()
        .map(|v| v.version_number)
        .collect();
    assert_eq!(numbers, vec![3, 2, 1]);
}

#[test]
fn jsonl_handles_race_across_threads_without_duplicates() {
    let temp = tempdir().expect("tempdir");
    let tpl = template("race");
    {
        let store = JsonlCatalogStore::open(temp.path()).expect("store");
        store.save_template(&tpl).expect("template");
        store.insert_version(&version(tpl.id, 1, "base")).expect("v1");
    }

    let root = temp.path().to_path_buf();
    let handles: Vec<_> = (0..6)
        .map(|idx| {
            let root = root.clone();
            let candidate = version(tpl.id, 2, &format!("edit {idx}"));
            thread::spawn(move || {
                let store = JsonlCatalogStore::open(root).expect("open");
                store.insert_version(&candidate).is_ok()
            })
        })
        .collect();
    let winners = handles
        .into_iter()
        .map(|handle| handle.join().expect("join"))
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);

    let reopened = JsonlCatalogStore::open(temp.path()).expect("reopen");
    assert_eq!(reopened.list_versions(tpl.id).expect("list").len(), 2);
}
