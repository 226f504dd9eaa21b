//! Catalog fragments and their literal/option-list content.

use crate::FragmentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named, reusable value that can prefill a placeholder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fragment {
    /// Fragment identifier.
    pub id: FragmentId,
    /// Label matched against placeholder names.
    pub label: String,
    /// Free-form grouping used by catalog views.
    pub category: String,
    /// Literal value or enumerated options.
    pub content: FragmentContent,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Fragment {
    /// Options offered by this fragment, if it is option based.
    pub fn options(&self) -> Option<&[String]> {
        match &self.content {
            FragmentContent::Options(options) => Some(options),
            FragmentContent::Literal(_) => None,
        }
    }
}

/// Fragment payload.
///
/// Persisted as a single string: `(a|b|c)` for options, anything else is a
/// literal. The shape is parsed once when the string enters the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FragmentContent {
    /// Fixed value used verbatim.
    Literal(String),
    /// Ordered, trimmed options; the first one is the default.
    Options(Vec<String>),
}

impl FragmentContent {
    /// Parse the persisted string form.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('(') && trimmed.ends_with(')') && trimmed.contains('|') {
            let inner = &trimmed[1..trimmed.len() - 1];
            let options = inner
                .split('|')
                .map(|option| option.trim().to_string())
                .collect();
            return FragmentContent::Options(options);
        }
        FragmentContent::Literal(raw.to_string())
    }

    /// Default value for a placeholder bound to this content.
    ///
    /// `selected` is an option chosen earlier by the author; it wins over the
    /// first option when present. Literal content ignores it.
    pub fn default_value(&self, selected: Option<&str>) -> String {
        match self {
            FragmentContent::Literal(value) => value.clone(),
            FragmentContent::Options(options) => match selected {
                Some(selected) if !selected.is_empty() => selected.to_string(),
                _ => options.first().cloned().unwrap_or_default(),
            },
        }
    }

    /// Return true when the content is an option list.
    pub fn is_options(&self) -> bool {
        matches!(self, FragmentContent::Options(_))
    }
}

impl From<String> for FragmentContent {
    fn from(value: String) -> Self {
        FragmentContent::parse(&value)
    }
}

impl From<&str> for FragmentContent {
    fn from(value: &str) -> Self {
        FragmentContent::parse(value)
    }
}

impl From<FragmentContent> for String {
    fn from(value: FragmentContent) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FragmentContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentContent::Literal(value) => f.write_str(value),
            FragmentContent::Options(options) => write!(f, "({})", options.join("|")),
        }
    }
}
