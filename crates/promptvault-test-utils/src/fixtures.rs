use chrono::Utc;
use promptvault_protocol::{Fragment, FragmentContent, ModelConfig};
use uuid::Uuid;

/// Build a catalog fragment from its persisted string form.
pub fn fragment(label: &str, content: &str) -> Fragment {
    Fragment {
        id: Uuid::new_v4(),
        label: label.to_string(),
        category: "general".to_string(),
        content: FragmentContent::parse(content),
        created_at: Utc::now(),
    }
}

/// Model config naming a model and temperature.
pub fn model_config(model: &str, temperature: f64) -> ModelConfig {
    ModelConfig::new(model, temperature)
}
