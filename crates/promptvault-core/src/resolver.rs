//! Default values for placeholders, drawn from the fragment catalog.

use crate::placeholder::{extract_placeholders, split_dotted};
use promptvault_protocol::{Fragment, FragmentId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fragment whose label matches the placeholder's label part, ignoring case.
pub fn find_fragment<'a>(name: &str, fragments: &'a [Fragment]) -> Option<&'a Fragment> {
    let (label, _) = split_dotted(name);
    let label = label.to_lowercase();
    fragments
        .iter()
        .find(|fragment| fragment.label.to_lowercase() == label)
}

/// Default value for a placeholder.
///
/// `label.option` yields the option suffix verbatim when the label matches.
/// A bare label yields the fragment's literal content or its first option.
/// No match yields the empty string.
pub fn resolve_default(name: &str, fragments: &[Fragment]) -> String {
    resolve_default_with(name, fragments, &BTreeMap::new())
}

/// Like [`resolve_default`], but an option recorded in `selections` for the
/// matched fragment replaces its first option.
pub fn resolve_default_with(
    name: &str,
    fragments: &[Fragment],
    selections: &BTreeMap<FragmentId, String>,
) -> String {
    let Some(fragment) = find_fragment(name, fragments) else {
        return String::new();
    };
    match split_dotted(name) {
        (_, Some(option)) => option.to_string(),
        (_, None) => fragment
            .content
            .default_value(selections.get(&fragment.id).map(String::as_str)),
    }
}

/// One editable variable of a template, with its prefilled value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSlot {
    /// Placeholder name as written in the template.
    pub name: String,
    /// Matched fragment id, if any.
    pub fragment_id: Option<FragmentId>,
    /// Matched fragment label, if any.
    pub fragment_label: Option<String>,
    /// Choices offered by an option-based fragment; empty otherwise.
    pub options: Vec<String>,
    /// Seeded value.
    pub value: String,
}

/// Build variable slots for every placeholder in `template_text`.
///
/// A non-empty value from `previous` is kept; otherwise the slot is seeded
/// with the fragment default.
pub fn prepare_variables(
    template_text: &str,
    fragments: &[Fragment],
    previous: &BTreeMap<String, String>,
    selections: &BTreeMap<FragmentId, String>,
) -> Vec<VariableSlot> {
    extract_placeholders(template_text)
        .into_iter()
        .map(|name| {
            let fragment = find_fragment(&name, fragments);
            let value = match previous.get(&name) {
                Some(value) if !value.is_empty() => value.clone(),
                _ => resolve_default_with(&name, fragments, selections),
            };
            VariableSlot {
                fragment_id: fragment.map(|fragment| fragment.id),
                fragment_label: fragment.map(|fragment| fragment.label.clone()),
                options: fragment
                    .and_then(|fragment| fragment.options())
                    .map(<[String]>::to_vec)
                    .unwrap_or_default(),
                value,
                name,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use promptvault_test_utils::fragment;

    #[test]
    fn dotted_names_use_the_option_suffix() {
        let fragments = vec![fragment("tono", "(formal|informal)")];
        assert_eq!(resolve_default("tono.formal", &fragments), "formal");
        assert_eq!(resolve_default("TONO.casual", &fragments), "casual");
        assert_eq!(resolve_default("tono", &fragments), "formal");
    }

    #[test]
    fn literal_fragments_default_to_content() {
        let fragments = vec![fragment("Audience", "  senior engineers ")];
        assert_eq!(resolve_default("audience", &fragments), "  senior engineers ");
    }

    #[test]
    fn unmatched_names_default_to_empty() {
        let fragments = vec![fragment("tono", "(formal|informal)")];
        assert_eq!(resolve_default("mood", &fragments), "");
        assert_eq!(resolve_default("mood.happy", &fragments), "");
    }

    #[test]
    fn selections_override_first_option() {
        let tone = fragment("tono", "(formal|informal)");
        let selections = BTreeMap::from([(tone.id, "informal".to_string())]);
        let fragments = vec![tone];
        assert_eq!(
            resolve_default_with("tono", &fragments, &selections),
            "informal"
        );
        assert_eq!(
            resolve_default_with("tono.formal", &fragments, &selections),
            "formal"
        );
    }

    #[test]
    fn prepare_variables_prefers_previous_values() {
        let tone = fragment("tone", "(warm|dry)");
        let fragments = vec![tone.clone()];
        let previous = BTreeMap::from([
            ("name".to_string(), "Ada".to_string()),
            ("tone".to_string(), String::new()),
        ]);
        let slots = prepare_variables(
            "{{tone}} hello to {{name}} from {{ tone }}",
            &fragments,
            &previous,
            &BTreeMap::new(),
        );
        assert_eq!(
            slots,
            vec![
                VariableSlot {
                    name: "tone".to_string(),
                    fragment_id: Some(tone.id),
                    fragment_label: Some("tone".to_string()),
                    options: vec!["warm".to_string(), "dry".to_string()],
                    value: "warm".to_string(),
                },
                VariableSlot {
                    name: "name".to_string(),
                    fragment_id: None,
                    fragment_label: None,
                    options: Vec::new(),
                    value: "Ada".to_string(),
                },
            ]
        );
    }
}
