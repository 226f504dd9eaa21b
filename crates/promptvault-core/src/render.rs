//! Placeholder substitution.

use crate::placeholder::{extract_placeholders, replace_tokens};
use std::collections::BTreeMap;

/// Value for `name`: exact key first, then the first key equal ignoring case.
pub fn lookup<'a>(values: &'a BTreeMap<String, String>, name: &str) -> Option<&'a String> {
    if let Some(value) = values.get(name) {
        return Some(value);
    }
    let lowered = name.to_lowercase();
    values
        .iter()
        .find(|(key, _)| key.to_lowercase() == lowered)
        .map(|(_, value)| value)
}

/// Substitute placeholder values into `template`.
///
/// Single pass and non-recursive: substituted text is never rescanned.
/// Tokens without a value are left verbatim.
pub fn render(template: &str, values: &BTreeMap<String, String>) -> String {
    replace_tokens(template, |name| lookup(values, name).cloned())
}

/// Placeholders of `template` that `values` cannot resolve.
pub fn unresolved(template: &str, values: &BTreeMap<String, String>) -> Vec<String> {
    extract_placeholders(template)
        .into_iter()
        .filter(|name| lookup(values, name).is_none())
        .collect()
}
