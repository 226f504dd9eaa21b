//! Error types for the promptvault engine.

use promptvault_config::ConfigError;
use promptvault_protocol::{FragmentId, GenerationError, TemplateId};
use promptvault_store::StoreError;
use thiserror::Error;

/// Errors returned by service operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Persistence failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// The provider call failed; nothing was recorded.
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
    /// Configuration could not be used.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Caller input was rejected before touching the store.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Template id is unknown to the store.
    #[error("unknown template: {0}")]
    UnknownTemplate(TemplateId),
    /// Fragment id is unknown to the store.
    #[error("unknown fragment: {0}")]
    UnknownFragment(FragmentId),
    /// No text generator is attached to the service.
    #[error("no text generator configured")]
    GeneratorUnavailable,
    /// Concurrent writers kept claiming the next version number.
    #[error("gave up minting a version for template {template_id} after {attempts} attempts")]
    VersionRetriesExhausted {
        template_id: TemplateId,
        attempts: u32,
    },
}
