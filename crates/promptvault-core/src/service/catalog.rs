//! Fragment and template management, variables, and history reads.

use super::{FragmentUpdate, NewFragment, NewTemplate, PromptService};
use crate::error::CoreError;
use crate::history::{ExecutionGroup, flatten_history, group_executions};
use crate::resolver::{VariableSlot, prepare_variables};
use chrono::Utc;
use log::{debug, info, warn};
use promptvault_config::ModelEntry;
use promptvault_protocol::{
    EventPayload, Fragment, FragmentContent, FragmentId, Template, TemplateId, Version,
    VersionHistory,
};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

impl PromptService {
    /// Add a fragment to the catalog.
    pub fn add_fragment(&self, input: NewFragment) -> Result<Fragment, CoreError> {
        let label = required("label", &input.label)?;
        if input.content.trim().is_empty() {
            return Err(CoreError::InvalidRequest(
                "fragment content cannot be empty".to_string(),
            ));
        }
        let fragment = Fragment {
            id: Uuid::new_v4(),
            label,
            category: input.category.trim().to_string(),
            content: FragmentContent::parse(&input.content),
            created_at: Utc::now(),
        };
        self.store.save_fragment(&fragment)?;
        info!(
            "fragment added (fragment_id={}, label={}, options={})",
            fragment.id,
            fragment.label,
            fragment.content.is_options()
        );
        Ok(fragment)
    }

    /// All fragments, newest first.
    pub fn list_fragments(&self) -> Result<Vec<Fragment>, CoreError> {
        Ok(self.store.list_fragments()?)
    }

    pub fn get_fragment(&self, id: FragmentId) -> Result<Fragment, CoreError> {
        self.store
            .get_fragment(id)?
            .ok_or(CoreError::UnknownFragment(id))
    }

    /// Edit a fragment in place. Templates linking it see the change.
    pub fn update_fragment(
        &self,
        id: FragmentId,
        update: FragmentUpdate,
    ) -> Result<Fragment, CoreError> {
        let mut fragment = self.get_fragment(id)?;
        if let Some(label) = update.label {
            fragment.label = required("label", &label)?;
        }
        if let Some(category) = update.category {
            fragment.category = category.trim().to_string();
        }
        if let Some(content) = update.content {
            if content.trim().is_empty() {
                return Err(CoreError::InvalidRequest(
                    "fragment content cannot be empty".to_string(),
                ));
            }
            fragment.content = FragmentContent::parse(&content);
        }
        self.store.save_fragment(&fragment)?;
        debug!("fragment updated (fragment_id={id})");
        Ok(fragment)
    }

    /// Remove a fragment. Templates keep a dangling reference that reads skip.
    pub fn delete_fragment(&self, id: FragmentId) -> Result<bool, CoreError> {
        Ok(self.store.delete_fragment(id)?)
    }

    /// Create a template and store its text and config as version 1.
    pub fn create_template(&self, input: NewTemplate) -> Result<(Template, Version), CoreError> {
        let name = required("name", &input.name)?;
        if input.template_text.trim().is_empty() {
            return Err(CoreError::InvalidRequest(
                "template text cannot be empty".to_string(),
            ));
        }
        self.require_fragments(&input.fragment_ids)?;

        let now = Utc::now();
        let template = Template {
            id: Uuid::new_v4(),
            name,
            description: input
                .description
                .map(|description| description.trim().to_string())
                .filter(|description| !description.is_empty()),
            fragment_refs: input.fragment_ids,
            created_at: now,
            updated_at: now,
        };
        self.store.save_template(&template)?;
        let version = Version {
            id: Uuid::new_v4(),
            template_id: template.id,
            version_number: 1,
            template_text: input.template_text,
            model_config: input.model_config,
            created_at: now,
        };
        self.store.insert_version(&version)?;
        info!(
            "template created (template_id={}, name={})",
            template.id, template.name
        );
        self.emit(EventPayload::VersionCreated {
            template_id: template.id,
            version_id: version.id,
            version_number: version.version_number,
        });
        Ok((template, version))
    }

    pub fn get_template(&self, id: TemplateId) -> Result<Template, CoreError> {
        self.store
            .get_template(id)?
            .ok_or(CoreError::UnknownTemplate(id))
    }

    /// All templates, newest first.
    pub fn list_templates(&self) -> Result<Vec<Template>, CoreError> {
        Ok(self.store.list_templates()?)
    }

    /// Latest version of a template, if it has any.
    pub fn latest_version(&self, template_id: TemplateId) -> Result<Option<Version>, CoreError> {
        self.get_template(template_id)?;
        Ok(self.store.latest_version(template_id)?)
    }

    /// Fragments linked to a template that still exist.
    pub fn linked_fragments(&self, template_id: TemplateId) -> Result<Vec<Fragment>, CoreError> {
        self.get_template(template_id)?;
        Ok(self.store.template_fragments(template_id)?)
    }

    /// Replace the template's fragment set with `fragment_ids`.
    pub fn link_fragments(
        &self,
        template_id: TemplateId,
        fragment_ids: BTreeSet<FragmentId>,
    ) -> Result<Template, CoreError> {
        let mut template = self.get_template(template_id)?;
        self.require_fragments(&fragment_ids)?;
        template.fragment_refs = fragment_ids;
        template.updated_at = Utc::now();
        self.store.save_template(&template)?;
        info!(
            "fragments linked (template_id={}, count={})",
            template_id,
            template.fragment_refs.len()
        );
        self.emit(EventPayload::FragmentsLinked {
            template_id,
            fragment_ids: template.fragment_refs.iter().copied().collect(),
        });
        Ok(template)
    }

    /// Delete a template with all of its versions and executions.
    pub fn delete_template(&self, template_id: TemplateId) -> Result<bool, CoreError> {
        let deleted = self.store.delete_template(template_id)?;
        if deleted {
            self.forget_template_lock(template_id);
            self.emit(EventPayload::TemplateDeleted { template_id });
        } else {
            warn!("template not found for delete (template_id={template_id})");
        }
        Ok(deleted)
    }

    /// Editable variables for a template.
    ///
    /// Uses `template_text` when given, else the latest version's text.
    /// Values are seeded from `previous` and then from linked fragments.
    pub fn prepare_variables(
        &self,
        template_id: TemplateId,
        template_text: Option<&str>,
        previous: &BTreeMap<String, String>,
        selections: &BTreeMap<FragmentId, String>,
    ) -> Result<Vec<VariableSlot>, CoreError> {
        let fragments = self.linked_fragments(template_id)?;
        let text = match template_text {
            Some(text) => text.to_string(),
            None => self
                .store
                .latest_version(template_id)?
                .map(|version| version.template_text)
                .unwrap_or_default(),
        };
        Ok(prepare_variables(&text, &fragments, previous, selections))
    }

    /// Variables of the template's most recent execution.
    pub fn last_variables(
        &self,
        template_id: TemplateId,
    ) -> Result<BTreeMap<String, String>, CoreError> {
        self.get_template(template_id)?;
        Ok(self
            .store
            .latest_execution(template_id)?
            .map(|execution| execution.variables_used)
            .unwrap_or_default())
    }

    /// Versions (highest first) with their executions (newest first).
    pub fn history(&self, template_id: TemplateId) -> Result<Vec<VersionHistory>, CoreError> {
        self.get_template(template_id)?;
        Ok(self.store.history(template_id)?)
    }

    /// Executions clustered by rendered prompt, model, and temperature.
    pub fn grouped_history(
        &self,
        template_id: TemplateId,
    ) -> Result<Vec<ExecutionGroup>, CoreError> {
        let history = self.history(template_id)?;
        Ok(group_executions(flatten_history(&history)))
    }

    /// Selectable models from config.
    pub fn model_catalog(&self) -> Vec<ModelEntry> {
        self.config.model_catalog()
    }

    fn require_fragments(&self, fragment_ids: &BTreeSet<FragmentId>) -> Result<(), CoreError> {
        for id in fragment_ids {
            if self.store.get_fragment(*id)?.is_none() {
                return Err(CoreError::UnknownFragment(*id));
            }
        }
        Ok(())
    }
}

fn required(field: &str, value: &str) -> Result<String, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidRequest(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}
