//! Process-local catalog store.

use crate::state::{CatalogEvent, CatalogState};
use crate::{CatalogStore, StoreError};
use log::debug;
use parking_lot::RwLock;
use promptvault_protocol::{
    Execution, ExecutionId, Fragment, FragmentId, Template, TemplateId, Version, VersionHistory,
    VersionId,
};

/// Catalog store that keeps everything in memory. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    state: RwLock<CatalogState>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn save_fragment(&self, fragment: &Fragment) -> Result<(), StoreError> {
        self.state.write().apply(CatalogEvent::FragmentSaved {
            fragment: fragment.clone(),
        })
    }

    fn get_fragment(&self, id: FragmentId) -> Result<Option<Fragment>, StoreError> {
        Ok(self.state.read().fragment(id))
    }

    fn list_fragments(&self) -> Result<Vec<Fragment>, StoreError> {
        Ok(self.state.read().fragments())
    }

    fn delete_fragment(&self, id: FragmentId) -> Result<bool, StoreError> {
        let mut state = self.state.write();
        if !state.has_fragment(id) {
            return Ok(false);
        }
        state.apply(CatalogEvent::FragmentDeleted { fragment_id: id })?;
        Ok(true)
    }

    fn save_template(&self, template: &Template) -> Result<(), StoreError> {
        self.state.write().apply(CatalogEvent::TemplateSaved {
            template: template.clone(),
        })
    }

    fn get_template(&self, id: TemplateId) -> Result<Option<Template>, StoreError> {
        Ok(self.state.read().template(id))
    }

    fn list_templates(&self) -> Result<Vec<Template>, StoreError> {
        Ok(self.state.read().templates())
    }

    fn delete_template(&self, id: TemplateId) -> Result<bool, StoreError> {
        let mut state = self.state.write();
        if !state.has_template(id) {
            return Ok(false);
        }
        state.apply(CatalogEvent::TemplateDeleted { template_id: id })?;
        Ok(true)
    }

    fn template_fragments(&self, id: TemplateId) -> Result<Vec<Fragment>, StoreError> {
        self.state.read().template_fragments(id)
    }

    fn latest_version(&self, template_id: TemplateId) -> Result<Option<Version>, StoreError> {
        Ok(self.state.read().latest_version(template_id).cloned())
    }

    fn get_version(&self, id: VersionId) -> Result<Option<Version>, StoreError> {
        Ok(self.state.read().version(id))
    }

    fn list_versions(&self, template_id: TemplateId) -> Result<Vec<Version>, StoreError> {
        Ok(self.state.read().versions(template_id))
    }

    fn insert_version(&self, version: &Version) -> Result<(), StoreError> {
        debug!(
            "inserting version (template_id={}, version_number={})",
            version.template_id, version.version_number
        );
        self.state.write().apply(CatalogEvent::VersionCreated {
            version: version.clone(),
        })
    }

    fn insert_execution(&self, execution: &Execution) -> Result<(), StoreError> {
        self.state.write().apply(CatalogEvent::ExecutionRecorded {
            execution: execution.clone(),
        })
    }

    fn history(&self, template_id: TemplateId) -> Result<Vec<VersionHistory>, StoreError> {
        self.state.read().history(template_id)
    }

    fn latest_execution(&self, template_id: TemplateId) -> Result<Option<Execution>, StoreError> {
        Ok(self.state.read().latest_execution(template_id))
    }

    fn delete_executions(&self, ids: &[ExecutionId]) -> Result<usize, StoreError> {
        let mut state = self.state.write();
        let existing = state.existing_executions(ids);
        let count = existing.len();
        if count > 0 {
            state.apply(CatalogEvent::ExecutionsDeleted {
                execution_ids: existing,
            })?;
        }
        Ok(count)
    }
}
