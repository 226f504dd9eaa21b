//! Shared data model, events, and provider contract for promptvault.

mod fragment;
mod generation;
mod model_config;

pub use fragment::{Fragment, FragmentContent};
pub use generation::{GenerationError, GenerationOutput, GenerationRequest, TextGenerator};
pub use model_config::{DEFAULT_PROVIDER, ModelConfig, canonical_json};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Unique identifier for a fragment.
pub type FragmentId = Uuid;
/// Unique identifier for a template.
pub type TemplateId = Uuid;
/// Unique identifier for a template version.
pub type VersionId = Uuid;
/// Unique identifier for an execution record.
pub type ExecutionId = Uuid;

/// Named, parameterized prompt. Owns its versions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Template {
    /// Template identifier.
    pub id: TemplateId,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Fragments offered as placeholder defaults. Replaced as a whole set.
    #[serde(default)]
    pub fragment_refs: BTreeSet<FragmentId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last metadata update.
    pub updated_at: DateTime<Utc>,
}

/// Immutable snapshot of a template's text and model configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Version {
    /// Version identifier.
    pub id: VersionId,
    /// Owning template.
    pub template_id: TemplateId,
    /// 1-based, gap-free counter per template.
    pub version_number: u32,
    /// Template text with `{{ placeholders }}`.
    pub template_text: String,
    /// Generation configuration.
    pub model_config: ModelConfig,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// One provider call against a version, with inputs and outputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Execution {
    /// Execution identifier.
    pub id: ExecutionId,
    /// Parent version.
    pub version_id: VersionId,
    /// Placeholder values used for rendering.
    pub variables_used: BTreeMap<String, String>,
    /// Text sent to the provider.
    pub rendered_prompt: String,
    /// Text returned by the provider.
    pub ai_output: String,
    /// Wall-clock provider latency.
    pub latency_ms: u64,
    /// Token usage reported by the provider.
    pub tokens_total: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A version together with its executions, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionHistory {
    pub version: Version,
    pub executions: Vec<Execution>,
}

/// Wrapper for events emitted by the execution service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMsg {
    /// Unique id for the event.
    pub id: Uuid,
    /// Timestamp when the event was created.
    pub created_at: DateTime<Utc>,
    /// Event payload content.
    pub payload: EventPayload,
}

impl EventMsg {
    /// Wrap a payload with a fresh id and timestamp.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            payload,
        }
    }
}

/// State changes other components may want to react to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum EventPayload {
    /// A new version was minted for a template.
    VersionCreated {
        template_id: TemplateId,
        version_id: VersionId,
        version_number: u32,
    },
    /// An execution was stored.
    ExecutionRecorded {
        template_id: TemplateId,
        version_id: VersionId,
        execution_id: ExecutionId,
    },
    /// A provider call failed; nothing was stored.
    ExecutionFailed {
        template_id: TemplateId,
        version_id: VersionId,
        latency_ms: u64,
        message: String,
    },
    /// Executions were removed in bulk.
    ExecutionsDeleted { execution_ids: Vec<ExecutionId> },
    /// A template's fragment set was replaced.
    FragmentsLinked {
        template_id: TemplateId,
        fragment_ids: Vec<FragmentId>,
    },
    /// A template and its history were removed.
    TemplateDeleted { template_id: TemplateId },
}

/// Receiver for service events, injected at construction.
pub trait EventSink: Send + Sync {
    /// Emit an event to downstream listeners.
    fn emit(&self, event: EventMsg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn event_payload_uses_tagged_representation() {
        let template_id = Uuid::nil();
        let payload = EventPayload::TemplateDeleted { template_id };
        let value = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(
            value,
            json!({ "type": "template_deleted", "payload": { "template_id": template_id } })
        );
    }

    #[test]
    fn fragment_round_trips_content_as_string() {
        let fragment = Fragment {
            id: Uuid::nil(),
            label: "tono".to_string(),
            category: "Style".to_string(),
            content: FragmentContent::parse("(formal|informal)"),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&fragment).expect("serialize");
        assert_eq!(value["content"], json!("(formal|informal)"));
        let decoded: Fragment = serde_json::from_value(value).expect("decode");
        assert_eq!(decoded, fragment);
    }
}
