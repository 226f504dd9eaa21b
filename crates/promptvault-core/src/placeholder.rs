//! Placeholder extraction for `{{ name }}` tokens.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// `{{`, optional whitespace, a non-greedy run without `}`, optional whitespace, `}}`.
static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^}]+?)\s*\}\}").ok());

/// Placeholder names in first-seen order, deduplicated by exact match.
///
/// Names keep the author's casing. Tokens whose name is blank (`{{ }}`) are
/// skipped; unterminated `{{` is never extracted.
pub fn extract_placeholders(text: &str) -> Vec<String> {
    let Some(regex) = PLACEHOLDER.as_ref() else {
        return Vec::new();
    };
    let mut names: Vec<String> = Vec::new();
    for caps in regex.captures_iter(text) {
        let name = caps[1].trim();
        if name.is_empty() || names.iter().any(|seen| seen == name) {
            continue;
        }
        names.push(name.to_string());
    }
    names
}

/// Replace every placeholder token in one pass.
///
/// `replace` receives the trimmed name and returns the substitution, or
/// `None` to keep the token verbatim.
pub(crate) fn replace_tokens<F>(text: &str, mut replace: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(regex) = PLACEHOLDER.as_ref() else {
        return text.to_string();
    };
    regex
        .replace_all(text, |caps: &Captures<'_>| {
            let name = caps[1].trim();
            replace(name).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Split `label.option` on the first dot.
///
/// An empty option part (`label.`) counts as no option.
pub fn split_dotted(name: &str) -> (&str, Option<&str>) {
    match name.split_once('.') {
        Some((label, option)) if !option.is_empty() => (label, Some(option)),
        Some((label, _)) => (label, None),
        None => (name, None),
    }
}
