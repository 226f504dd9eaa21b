//! Persistence for fragments, templates, versions, and executions.
//!
//! The [`CatalogStore`] trait is the only contract the engine relies on. Two
//! implementations ship here: a process-local store and a JSONL event log
//! that is replayed on open.

mod error;
mod jsonl;
mod memory;
mod state;

pub use error::{EntityKind, StoreError};
pub use jsonl::JsonlCatalogStore;
pub use memory::MemoryCatalogStore;

use promptvault_protocol::{
    Execution, ExecutionId, Fragment, FragmentId, Template, TemplateId, Version, VersionHistory,
    VersionId,
};

/// Persistent store abstraction for the prompt catalog.
pub trait CatalogStore: Send + Sync {
    /// Insert or replace a fragment.
    fn save_fragment(&self, fragment: &Fragment) -> Result<(), StoreError>;
    /// Load a fragment by id.
    fn get_fragment(&self, id: FragmentId) -> Result<Option<Fragment>, StoreError>;
    /// All fragments, newest first.
    fn list_fragments(&self) -> Result<Vec<Fragment>, StoreError>;
    /// Delete a fragment. Templates referencing it keep a dangling id.
    fn delete_fragment(&self, id: FragmentId) -> Result<bool, StoreError>;

    /// Insert or replace template metadata (name, description, fragment set).
    fn save_template(&self, template: &Template) -> Result<(), StoreError>;
    /// Load a template by id.
    fn get_template(&self, id: TemplateId) -> Result<Option<Template>, StoreError>;
    /// All templates, newest first.
    fn list_templates(&self) -> Result<Vec<Template>, StoreError>;
    /// Delete a template together with its versions and executions.
    fn delete_template(&self, id: TemplateId) -> Result<bool, StoreError>;
    /// Fragments referenced by a template; dangling references are skipped.
    fn template_fragments(&self, id: TemplateId) -> Result<Vec<Fragment>, StoreError>;

    /// Version with the highest number for a template.
    fn latest_version(&self, template_id: TemplateId) -> Result<Option<Version>, StoreError>;
    /// Load a version by id.
    fn get_version(&self, id: VersionId) -> Result<Option<Version>, StoreError>;
    /// All versions of a template, highest number first.
    fn list_versions(&self, template_id: TemplateId) -> Result<Vec<Version>, StoreError>;
    /// Append a version.
    ///
    /// Succeeds only when `version.version_number` is exactly one past the
    /// current latest for the template; otherwise returns
    /// [`StoreError::VersionConflict`] and stores nothing.
    fn insert_version(&self, version: &Version) -> Result<(), StoreError>;

    /// Append an execution under an existing version.
    fn insert_execution(&self, execution: &Execution) -> Result<(), StoreError>;
    /// Versions (highest first) with their executions (newest first).
    fn history(&self, template_id: TemplateId) -> Result<Vec<VersionHistory>, StoreError>;
    /// Most recent execution across all versions of a template.
    fn latest_execution(&self, template_id: TemplateId) -> Result<Option<Execution>, StoreError>;
    /// Delete executions by id, returning how many existed.
    fn delete_executions(&self, ids: &[ExecutionId]) -> Result<usize, StoreError>;
}
