//! JSON merge helpers for layered configuration.

use serde_json::Value;

/// Merge a higher-precedence layer into the accumulated config.
///
/// Objects merge key by key, everything else is replaced wholesale. A `null`
/// in the overlay removes the key so lower layers can be reset to defaults.
pub(super) fn merge_layer(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if value.is_null() {
                    base_map.remove(key);
                    continue;
                }
                match base_map.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge_layer(existing, value);
                    }
                    _ => {
                        base_map.insert(key.clone(), strip_nulls(value));
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = strip_nulls(overlay_value);
        }
    }
}

/// Drop `null` object members so the effective config never carries them.
fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, member)| !member.is_null())
                .map(|(key, member)| (key.clone(), strip_nulls(member)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::merge_layer;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn nested_objects_merge_and_scalars_replace() {
        let mut base = json!({ "defaults": { "model": "a", "temperature": 0.2 }, "models": [1] });
        merge_layer(
            &mut base,
            &json!({ "defaults": { "model": "b" }, "models": [2, 3] }),
        );
        assert_eq!(
            base,
            json!({ "defaults": { "model": "b", "temperature": 0.2 }, "models": [2, 3] })
        );
    }

    #[test]
    fn null_unsets_lower_layer_value() {
        let mut base = json!({ "storage": { "path": "/tmp/x", "backend": "jsonl" } });
        merge_layer(&mut base, &json!({ "storage": { "path": null } }));
        assert_eq!(base, json!({ "storage": { "backend": "jsonl" } }));
    }

    #[test]
    fn fresh_objects_are_inserted_without_nulls() {
        let mut base = json!({});
        merge_layer(&mut base, &json!({ "provider": { "base_url": "x", "kind": null } }));
        assert_eq!(base, json!({ "provider": { "base_url": "x" } }));
    }
}
