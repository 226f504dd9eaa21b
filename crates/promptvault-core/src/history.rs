//! Flattening and grouping of a template's execution log.

use promptvault_protocol::{Execution, ModelConfig, VersionHistory};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Key value used when a config leaves model or temperature unset.
pub const UNKNOWN_KEY: &str = "unknown";

/// An execution with its parent version's details attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub execution: Execution,
    pub version_number: u32,
    pub template_text: String,
    pub model_config: ModelConfig,
}

/// Executions sharing a rendered prompt, model, and temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionGroup {
    pub rendered_prompt: String,
    pub variables_used: BTreeMap<String, String>,
    pub template_text: String,
    pub model_config: ModelConfig,
    /// Newest first.
    pub variations: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupKey {
    rendered_prompt: String,
    model: String,
    temperature: String,
}

impl GroupKey {
    fn of(entry: &HistoryEntry) -> Self {
        let config = &entry.model_config;
        Self {
            rendered_prompt: entry.execution.rendered_prompt.clone(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| UNKNOWN_KEY.to_string()),
            temperature: config
                .temperature
                .map(|temperature| temperature.to_string())
                .unwrap_or_else(|| UNKNOWN_KEY.to_string()),
        }
    }
}

/// Attach version details to every execution.
pub fn flatten_history(history: &[VersionHistory]) -> Vec<HistoryEntry> {
    history
        .iter()
        .flat_map(|entry| {
            entry.executions.iter().map(|execution| HistoryEntry {
                execution: execution.clone(),
                version_number: entry.version.version_number,
                template_text: entry.version.template_text.clone(),
                model_config: entry.version.model_config.clone(),
            })
        })
        .collect()
}

/// Group executions for side-by-side comparison.
///
/// Entries are sorted newest first (stable), then walked once. Groups appear
/// in order of their newest member; variations stay newest first.
pub fn group_executions(mut entries: Vec<HistoryEntry>) -> Vec<ExecutionGroup> {
    entries.sort_by(|a, b| b.execution.created_at.cmp(&a.execution.created_at));

    let mut groups: Vec<ExecutionGroup> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    for entry in entries {
        let key = GroupKey::of(&entry);
        match index.get(&key) {
            Some(&position) => groups[position].variations.push(entry),
            None => {
                index.insert(key, groups.len());
                groups.push(ExecutionGroup {
                    rendered_prompt: entry.execution.rendered_prompt.clone(),
                    variables_used: entry.execution.variables_used.clone(),
                    template_text: entry.template_text.clone(),
                    model_config: entry.model_config.clone(),
                    variations: vec![entry],
                });
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use promptvault_test_utils::model_config;
    use uuid::Uuid;

    fn entry(prompt: &str, config: ModelConfig, age_secs: i64) -> HistoryEntry {
        HistoryEntry {
            execution: Execution {
                id: Uuid::new_v4(),
                version_id: Uuid::new_v4(),
                variables_used: BTreeMap::new(),
                rendered_prompt: prompt.to_string(),
                ai_output: String::new(),
                latency_ms: 0,
                tokens_total: 0,
                created_at: Utc::now() - Duration::seconds(age_secs),
            },
            version_number: 1,
            template_text: prompt.to_string(),
            model_config: config,
        }
    }

    fn ids(group: &ExecutionGroup) -> Vec<Uuid> {
        group.variations.iter().map(|v| v.execution.id).collect()
    }

    #[test]
    fn same_input_lands_in_one_group_newest_first() {
        let oldest = entry("p", model_config("m", 0.7), 30);
        let middle = entry("p", model_config("m", 0.7), 20);
        let newest = entry("p", model_config("m", 0.7), 10);
        let other = entry("q", model_config("m", 0.7), 0);

        let groups = group_executions(vec![
            middle.clone(),
            other.clone(),
            oldest.clone(),
            newest.clone(),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].rendered_prompt, "q");
        assert_eq!(ids(&groups[0]), vec![other.execution.id]);
        assert_eq!(
            ids(&groups[1]),
            vec![newest.execution.id, middle.execution.id, oldest.execution.id]
        );
    }

    #[test]
    fn model_and_temperature_split_groups() {
        let groups = group_executions(vec![
            entry("p", model_config("m", 0.7), 3),
            entry("p", model_config("m", 0.2), 2),
            entry("p", model_config("n", 0.7), 1),
        ]);
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn missing_config_fields_group_together() {
        let groups = group_executions(vec![
            entry("p", ModelConfig::default(), 2),
            entry("p", ModelConfig::default(), 1),
        ]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].variations.len(), 2);
    }
}
