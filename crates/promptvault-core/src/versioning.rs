//! Change detection between a candidate edit and the latest version.

use promptvault_protocol::{ModelConfig, Version};
use serde::{Deserialize, Serialize};

/// Outcome of comparing a candidate against the latest version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDecision {
    /// Whether a new version must be minted.
    pub changed: bool,
    /// Number of the version the execution will belong to.
    pub next_version_number: u32,
}

/// Decide whether `text` and `config` require a new version.
///
/// Text compares byte-for-byte; configs compare by canonical JSON.
pub fn should_create_version(
    latest: Option<&Version>,
    text: &str,
    config: &ModelConfig,
) -> VersionDecision {
    match latest {
        None => VersionDecision {
            changed: true,
            next_version_number: 1,
        },
        Some(latest) => {
            let changed = latest.template_text != text || !latest.model_config.same_as(config);
            VersionDecision {
                changed,
                next_version_number: if changed {
                    latest.version_number + 1
                } else {
                    latest.version_number
                },
            }
        }
    }
}
