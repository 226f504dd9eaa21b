//! Error types for catalog persistence.

use promptvault_protocol::TemplateId;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Entity kinds stored in the catalog, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Fragment,
    Template,
    Version,
    Execution,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Fragment => "fragment",
            EntityKind::Template => "template",
            EntityKind::Version => "version",
            EntityKind::Execution => "execution",
        };
        f.write_str(name)
    }
}

/// Errors returned by catalog stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unsupported schema version: {0}")]
    UnsupportedSchema(u32),
    #[error("catalog log is missing its schema header")]
    MissingSchemaHeader,
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: Uuid },
    #[error("{kind} already exists: {id}")]
    Duplicate { kind: EntityKind, id: Uuid },
    /// Another writer minted this version number first.
    #[error("version {version_number} of template {template_id} conflicts with the latest version")]
    VersionConflict {
        template_id: TemplateId,
        version_number: u32,
    },
}

impl StoreError {
    pub(crate) fn not_found(kind: EntityKind, id: Uuid) -> Self {
        StoreError::NotFound { kind, id }
    }
}
