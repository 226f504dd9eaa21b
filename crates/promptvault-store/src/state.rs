//! In-memory catalog state shared by every store backend.
//!
//! Mutations are expressed as [`CatalogEvent`]s. The JSONL backend persists
//! the same events, so replaying a log and applying writes live go through
//! one code path.

use crate::error::{EntityKind, StoreError};
use promptvault_protocol::{
    Execution, ExecutionId, Fragment, FragmentId, Template, TemplateId, Version, VersionHistory,
    VersionId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Current on-disk schema version.
pub(crate) const SCHEMA_VERSION: u32 = 1;

/// A single catalog mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum CatalogEvent {
    SchemaVersion { version: u32 },
    FragmentSaved { fragment: Fragment },
    FragmentDeleted { fragment_id: FragmentId },
    TemplateSaved { template: Template },
    TemplateDeleted { template_id: TemplateId },
    VersionCreated { version: Version },
    ExecutionRecorded { execution: Execution },
    ExecutionsDeleted { execution_ids: Vec<ExecutionId> },
}

#[derive(Debug, Default)]
pub(crate) struct CatalogState {
    fragments: HashMap<FragmentId, Fragment>,
    templates: HashMap<TemplateId, Template>,
    versions: HashMap<VersionId, Version>,
    /// Version ids per template in ascending number order.
    template_versions: HashMap<TemplateId, Vec<VersionId>>,
    executions: HashMap<ExecutionId, Execution>,
    /// Execution ids per version in insertion order.
    version_executions: HashMap<VersionId, Vec<ExecutionId>>,
}

impl CatalogState {
    /// Check that an event can be applied without changing anything.
    pub(crate) fn validate(&self, event: &CatalogEvent) -> Result<(), StoreError> {
        match event {
            CatalogEvent::SchemaVersion { version } => {
                if *version > SCHEMA_VERSION {
                    return Err(StoreError::UnsupportedSchema(*version));
                }
            }
            CatalogEvent::FragmentSaved { .. }
            | CatalogEvent::FragmentDeleted { .. }
            | CatalogEvent::TemplateSaved { .. }
            | CatalogEvent::TemplateDeleted { .. }
            | CatalogEvent::ExecutionsDeleted { .. } => {}
            CatalogEvent::VersionCreated { version } => {
                if !self.templates.contains_key(&version.template_id) {
                    return Err(StoreError::not_found(
                        EntityKind::Template,
                        version.template_id,
                    ));
                }
                if self.versions.contains_key(&version.id) {
                    return Err(StoreError::Duplicate {
                        kind: EntityKind::Version,
                        id: version.id,
                    });
                }
                let latest = self
                    .latest_version(version.template_id)
                    .map(|latest| latest.version_number)
                    .unwrap_or(0);
                if version.version_number != latest + 1 {
                    return Err(StoreError::VersionConflict {
                        template_id: version.template_id,
                        version_number: version.version_number,
                    });
                }
            }
            CatalogEvent::ExecutionRecorded { execution } => {
                if !self.versions.contains_key(&execution.version_id) {
                    return Err(StoreError::not_found(
                        EntityKind::Version,
                        execution.version_id,
                    ));
                }
                if self.executions.contains_key(&execution.id) {
                    return Err(StoreError::Duplicate {
                        kind: EntityKind::Execution,
                        id: execution.id,
                    });
                }
            }
        }
        Ok(())
    }

    /// Apply an event that already passed [`CatalogState::validate`].
    pub(crate) fn apply_validated(&mut self, event: CatalogEvent) {
        match event {
            CatalogEvent::SchemaVersion { .. } => {}
            CatalogEvent::FragmentSaved { fragment } => {
                self.fragments.insert(fragment.id, fragment);
            }
            CatalogEvent::FragmentDeleted { fragment_id } => {
                self.fragments.remove(&fragment_id);
            }
            CatalogEvent::TemplateSaved { template } => {
                self.templates.insert(template.id, template);
            }
            CatalogEvent::TemplateDeleted { template_id } => {
                self.templates.remove(&template_id);
                for version_id in self.template_versions.remove(&template_id).unwrap_or_default() {
                    self.versions.remove(&version_id);
                    for execution_id in self
                        .version_executions
                        .remove(&version_id)
                        .unwrap_or_default()
                    {
                        self.executions.remove(&execution_id);
                    }
                }
            }
            CatalogEvent::VersionCreated { version } => {
                self.template_versions
                    .entry(version.template_id)
                    .or_default()
                    .push(version.id);
                self.versions.insert(version.id, version);
            }
            CatalogEvent::ExecutionRecorded { execution } => {
                self.version_executions
                    .entry(execution.version_id)
                    .or_default()
                    .push(execution.id);
                self.executions.insert(execution.id, execution);
            }
            CatalogEvent::ExecutionsDeleted { execution_ids } => {
                for execution_id in execution_ids {
                    let Some(execution) = self.executions.remove(&execution_id) else {
                        continue;
                    };
                    if let Some(ids) = self.version_executions.get_mut(&execution.version_id) {
                        ids.retain(|id| *id != execution_id);
                    }
                }
            }
        }
    }

    /// Validate and apply in one step.
    pub(crate) fn apply(&mut self, event: CatalogEvent) -> Result<(), StoreError> {
        self.validate(&event)?;
        self.apply_validated(event);
        Ok(())
    }

    pub(crate) fn fragment(&self, id: FragmentId) -> Option<Fragment> {
        self.fragments.get(&id).cloned()
    }

    pub(crate) fn has_fragment(&self, id: FragmentId) -> bool {
        self.fragments.contains_key(&id)
    }

    pub(crate) fn fragments(&self) -> Vec<Fragment> {
        let mut fragments: Vec<_> = self.fragments.values().cloned().collect();
        fragments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        fragments
    }

    pub(crate) fn template(&self, id: TemplateId) -> Option<Template> {
        self.templates.get(&id).cloned()
    }

    pub(crate) fn has_template(&self, id: TemplateId) -> bool {
        self.templates.contains_key(&id)
    }

    pub(crate) fn templates(&self) -> Vec<Template> {
        let mut templates: Vec<_> = self.templates.values().cloned().collect();
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        templates
    }

    pub(crate) fn template_fragments(&self, id: TemplateId) -> Result<Vec<Fragment>, StoreError> {
        let template = self
            .templates
            .get(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Template, id))?;
        Ok(template
            .fragment_refs
            .iter()
            .filter_map(|fragment_id| self.fragments.get(fragment_id).cloned())
            .collect())
    }

    pub(crate) fn latest_version(&self, template_id: TemplateId) -> Option<&Version> {
        self.template_versions
            .get(&template_id)
            .and_then(|ids| ids.last())
            .and_then(|id| self.versions.get(id))
    }

    pub(crate) fn version(&self, id: VersionId) -> Option<Version> {
        self.versions.get(&id).cloned()
    }

    pub(crate) fn versions(&self, template_id: TemplateId) -> Vec<Version> {
        self.template_versions
            .get(&template_id)
            .map(|ids| {
                ids.iter()
                    .rev()
                    .filter_map(|id| self.versions.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Executions of a version, newest first; ties keep reverse insertion order.
    fn executions_for(&self, version_id: VersionId) -> Vec<Execution> {
        let mut executions: Vec<Execution> = self
            .version_executions
            .get(&version_id)
            .map(|ids| {
                ids.iter()
                    .rev()
                    .filter_map(|id| self.executions.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        executions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        executions
    }

    pub(crate) fn history(&self, template_id: TemplateId) -> Result<Vec<VersionHistory>, StoreError> {
        if !self.templates.contains_key(&template_id) {
            return Err(StoreError::not_found(EntityKind::Template, template_id));
        }
        Ok(self
            .versions(template_id)
            .into_iter()
            .map(|version| {
                let executions = self.executions_for(version.id);
                VersionHistory {
                    version,
                    executions,
                }
            })
            .collect())
    }

    pub(crate) fn latest_execution(&self, template_id: TemplateId) -> Option<Execution> {
        // Versions come highest first, so on equal timestamps the newer version wins.
        self.versions(template_id)
            .iter()
            .filter_map(|version| self.executions_for(version.id).into_iter().next())
            .reduce(|best, candidate| {
                if candidate.created_at > best.created_at {
                    candidate
                } else {
                    best
                }
            })
    }

    /// Ids from `ids` that are currently stored, deduplicated in input order.
    pub(crate) fn existing_executions(&self, ids: &[ExecutionId]) -> Vec<ExecutionId> {
        let mut existing = Vec::new();
        for id in ids {
            if self.executions.contains_key(id) && !existing.contains(id) {
                existing.push(*id);
            }
        }
        existing
    }
}
