//! Schema validation helpers for promptvault JSON5 configuration.

use super::SchemaMode;
use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer (or the merged result) against the schema.
pub(super) fn validate_layer_schema(
    value: &Value,
    mode: SchemaMode,
    layer: &str,
) -> Result<(), ConfigError> {
    let checker = Checker { mode, layer };
    let map = checker.object(value, "")?;
    checker.allowed_keys(
        map,
        &[
            "$schema",
            "storage",
            "provider",
            "defaults",
            "models",
            "execution",
        ],
        "",
    )?;

    if let Some(value) = checker.present(map, "$schema") {
        checker.string(value, "$schema")?;
    }
    if let Some(value) = checker.present(map, "storage") {
        checker.storage(value, "storage")?;
    }
    if let Some(value) = checker.present(map, "provider") {
        checker.provider(value, "provider")?;
    }
    if let Some(value) = checker.present(map, "defaults") {
        checker.defaults(value, "defaults")?;
    }
    if let Some(value) = checker.present(map, "models") {
        checker.models(value, "models")?;
    }
    if let Some(value) = checker.present(map, "execution") {
        checker.execution(value, "execution")?;
    }
    Ok(())
}

/// Per-layer validation context.
struct Checker<'a> {
    mode: SchemaMode,
    layer: &'a str,
}

impl Checker<'_> {
    /// Fetch a member, treating `null` as absent in partial layers.
    fn present<'v>(&self, map: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
        match map.get(key) {
            Some(Value::Null) if self.mode == SchemaMode::Partial => None,
            other => other,
        }
    }

    /// Validate the "storage" block.
    fn storage(&self, value: &Value, path: &str) -> Result<(), ConfigError> {
        let map = self.object(value, path)?;
        self.allowed_keys(map, &["backend", "path"], path)?;
        if let Some(value) = self.present(map, "backend") {
            self.one_of(value, &["memory", "jsonl"], &join_path(path, "backend"))?;
        }
        if let Some(value) = self.present(map, "path") {
            self.string(value, &join_path(path, "path"))?;
        }
        Ok(())
    }

    /// Validate the "provider" block.
    fn provider(&self, value: &Value, path: &str) -> Result<(), ConfigError> {
        let map = self.object(value, path)?;
        self.allowed_keys(map, &["kind", "base_url", "api_key_env", "timeout_ms"], path)?;
        if let Some(value) = self.present(map, "kind") {
            self.one_of(value, &["openai"], &join_path(path, "kind"))?;
        }
        for key in ["base_url", "api_key_env"] {
            if let Some(value) = self.present(map, key) {
                self.string(value, &join_path(path, key))?;
            }
        }
        if let Some(value) = self.present(map, "timeout_ms") {
            self.unsigned(value, &join_path(path, "timeout_ms"))?;
        }
        Ok(())
    }

    /// Validate the "defaults" block.
    fn defaults(&self, value: &Value, path: &str) -> Result<(), ConfigError> {
        let map = self.object(value, path)?;
        self.allowed_keys(
            map,
            &[
                "provider",
                "model",
                "temperature",
                "max_tokens",
                "max_tokens_cap",
            ],
            path,
        )?;
        for key in ["provider", "model"] {
            if let Some(value) = self.present(map, key) {
                self.string(value, &join_path(path, key))?;
            }
        }
        if let Some(value) = self.present(map, "temperature") {
            self.number(value, &join_path(path, "temperature"))?;
        }
        for key in ["max_tokens", "max_tokens_cap"] {
            if let Some(value) = self.present(map, key) {
                self.unsigned(value, &join_path(path, key))?;
            }
        }
        Ok(())
    }

    /// Validate the "models" catalog.
    fn models(&self, value: &Value, path: &str) -> Result<(), ConfigError> {
        let Value::Array(entries) = value else {
            return Err(self.invalid(path, "expected array"));
        };
        for (idx, entry) in entries.iter().enumerate() {
            let entry_path = format!("{path}[{idx}]");
            let map = self.object(entry, &entry_path)?;
            self.allowed_keys(map, &["name", "default"], &entry_path)?;
            match map.get("name") {
                Some(value) => self.string(value, &join_path(&entry_path, "name"))?,
                None => return Err(self.invalid(&join_path(&entry_path, "name"), "required")),
            }
            if let Some(value) = self.present(map, "default") {
                self.boolean(value, &join_path(&entry_path, "default"))?;
            }
        }
        Ok(())
    }

    /// Validate the "execution" block.
    fn execution(&self, value: &Value, path: &str) -> Result<(), ConfigError> {
        let map = self.object(value, path)?;
        self.allowed_keys(map, &["version_retry_limit"], path)?;
        if let Some(value) = self.present(map, "version_retry_limit") {
            self.unsigned(value, &join_path(path, "version_retry_limit"))?;
        }
        Ok(())
    }

    fn object<'v>(&self, value: &'v Value, path: &str) -> Result<&'v Map<String, Value>, ConfigError> {
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(self.invalid(path, "expected object")),
        }
    }

    fn string(&self, value: &Value, path: &str) -> Result<(), ConfigError> {
        if value.is_string() {
            Ok(())
        } else {
            Err(self.invalid(path, "expected string"))
        }
    }

    fn boolean(&self, value: &Value, path: &str) -> Result<(), ConfigError> {
        if value.is_boolean() {
            Ok(())
        } else {
            Err(self.invalid(path, "expected bool"))
        }
    }

    fn unsigned(&self, value: &Value, path: &str) -> Result<(), ConfigError> {
        if value.is_u64() {
            Ok(())
        } else {
            Err(self.invalid(path, "expected non-negative integer"))
        }
    }

    fn number(&self, value: &Value, path: &str) -> Result<(), ConfigError> {
        if value.is_number() {
            Ok(())
        } else {
            Err(self.invalid(path, "expected number"))
        }
    }

    fn one_of(&self, value: &Value, allowed: &[&str], path: &str) -> Result<(), ConfigError> {
        match value.as_str() {
            Some(raw) if allowed.contains(&raw) => Ok(()),
            _ => Err(self.invalid(path, &format!("expected one of {}", allowed.join(", ")))),
        }
    }

    /// Ensure an object contains only allowed keys.
    fn allowed_keys(
        &self,
        map: &Map<String, Value>,
        allowed: &[&str],
        path: &str,
    ) -> Result<(), ConfigError> {
        match map.keys().find(|key| !allowed.contains(&key.as_str())) {
            Some(key) => Err(self.invalid(&join_path(path, key), "unknown key")),
            None => Ok(()),
        }
    }

    /// Build a structured invalid-field error.
    fn invalid(&self, path: &str, message: &str) -> ConfigError {
        let normalized_path = if path.is_empty() { "root" } else { path };
        ConfigError::InvalidField {
            path: format!("{}:{normalized_path}", self.layer),
            message: message.to_string(),
        }
    }
}

/// Join nested paths for better error messages.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
