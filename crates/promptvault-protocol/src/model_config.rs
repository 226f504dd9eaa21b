//! Generation configuration attached to each template version.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Provider name used when a config does not specify one.
pub const DEFAULT_PROVIDER: &str = "openai";

/// Model configuration stored on a version.
///
/// Treated as an opaque record: keys this crate does not know about are kept
/// in `extra` so they still take part in change detection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            temperature: None,
            max_tokens: None,
            extra: BTreeMap::new(),
        }
    }
}

impl ModelConfig {
    /// Config for a model and temperature with the default provider.
    pub fn new(model: impl Into<String>, temperature: f64) -> Self {
        Self {
            model: Some(model.into()),
            temperature: Some(temperature),
            ..Self::default()
        }
    }

    /// Set the requested completion size.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the provider name.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Canonical JSON form used for equality between configs.
    ///
    /// Object keys are sorted at every depth and `null` members are dropped,
    /// so an omitted key and an explicit `null` compare equal.
    pub fn canonical_json(&self) -> String {
        let value = serde_json::to_value(self).unwrap_or(Value::Null);
        canonical_json(&value)
    }

    /// Compare two configs by their canonical JSON form.
    pub fn same_as(&self, other: &ModelConfig) -> bool {
        self.canonical_json() == other.canonical_json()
    }
}

/// Render a JSON value with sorted keys and without `null` object members.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let sorted = sorted_members(map);
            out.push('{');
            for (idx, (key, member)) in sorted.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(member, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

fn sorted_members(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut members: Vec<_> = map.iter().filter(|(_, value)| !value.is_null()).collect();
    members.sort_by(|a, b| a.0.cmp(b.0));
    members
}
