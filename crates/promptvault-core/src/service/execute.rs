//! Version minting and provider execution.

use super::{ExecuteRequest, ExecutionOutcome, PromptService};
use crate::error::CoreError;
use crate::render::render;
use crate::versioning::{VersionDecision, should_create_version};
use chrono::Utc;
use log::{debug, info, warn};
use promptvault_config::PromptVaultConfig;
use promptvault_protocol::{
    EventPayload, Execution, ExecutionId, GenerationError, GenerationOutput, GenerationRequest,
    ModelConfig, TemplateId, Version,
};
use promptvault_store::StoreError;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Build the provider request for a version's config.
///
/// Unset fields fall back to the configured defaults; `max_tokens` is capped.
pub fn shape_request(
    config: &PromptVaultConfig,
    model_config: &ModelConfig,
    prompt: String,
) -> GenerationRequest {
    let defaults = &config.defaults;
    let model = model_config
        .model
        .clone()
        .filter(|model| !model.trim().is_empty())
        .unwrap_or_else(|| config.default_model());
    let max_tokens = model_config
        .max_tokens
        .unwrap_or(defaults.max_tokens)
        .min(defaults.max_tokens_cap);
    GenerationRequest {
        prompt,
        model,
        temperature: model_config.temperature.unwrap_or(defaults.temperature),
        max_tokens: Some(max_tokens),
    }
}

impl PromptService {
    /// Report whether `text` and `config` would mint a new version.
    pub fn preview_version(
        &self,
        template_id: TemplateId,
        text: &str,
        config: &ModelConfig,
    ) -> Result<VersionDecision, CoreError> {
        self.get_template(template_id)?;
        let latest = self.store.latest_version(template_id)?;
        Ok(should_create_version(latest.as_ref(), text, config))
    }

    /// Render, resolve the version, call the provider, and record the result.
    ///
    /// A newly minted version is kept even when the provider call fails; the
    /// failed call itself leaves no execution record.
    pub async fn execute(&self, request: ExecuteRequest) -> Result<ExecutionOutcome, CoreError> {
        let generator = self
            .generator
            .clone()
            .ok_or(CoreError::GeneratorUnavailable)?;
        if request.template_text.trim().is_empty() {
            return Err(CoreError::InvalidRequest(
                "template text cannot be empty".to_string(),
            ));
        }
        let template_id = request.template_id;
        self.get_template(template_id)?;

        let (version, version_created) =
            self.resolve_version(template_id, &request.template_text, &request.model_config)?;
        let rendered_prompt = render(&version.template_text, &request.variables);
        let generation = shape_request(
            &self.config,
            &version.model_config,
            rendered_prompt.clone(),
        );
        debug!(
            "executing template (template_id={}, version={}, provider={}, model={}, prompt_len={})",
            template_id,
            version.version_number,
            generator.name(),
            generation.model,
            rendered_prompt.len()
        );

        let timeout_ms = self.config.provider.timeout_ms;
        let started = Instant::now();
        let result = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            generator.generate(&generation),
        )
        .await
        .unwrap_or(Err(GenerationError::Timeout(timeout_ms)))
        .and_then(reject_empty);
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                warn!(
                    "generation failed (template_id={}, version={}, latency_ms={}): {}",
                    template_id, version.version_number, latency_ms, err
                );
                self.emit(EventPayload::ExecutionFailed {
                    template_id,
                    version_id: version.id,
                    latency_ms,
                    message: err.to_string(),
                });
                return Err(err.into());
            }
        };

        let execution = Execution {
            id: Uuid::new_v4(),
            version_id: version.id,
            variables_used: request.variables,
            rendered_prompt,
            ai_output: output.output_text,
            latency_ms,
            tokens_total: output.total_tokens,
            created_at: Utc::now(),
        };
        self.store.insert_execution(&execution)?;
        info!(
            "execution recorded (template_id={}, version={}, execution_id={}, latency_ms={}, tokens={})",
            template_id,
            version.version_number,
            execution.id,
            execution.latency_ms,
            execution.tokens_total
        );
        self.emit(EventPayload::ExecutionRecorded {
            template_id,
            version_id: version.id,
            execution_id: execution.id,
        });
        Ok(ExecutionOutcome {
            version,
            version_created,
            execution,
        })
    }

    /// Delete executions by id. Returns how many existed.
    pub fn delete_executions(&self, ids: &[ExecutionId]) -> Result<usize, CoreError> {
        if ids.is_empty() {
            return Err(CoreError::InvalidRequest(
                "no execution ids given".to_string(),
            ));
        }
        let removed = self.store.delete_executions(ids)?;
        if removed > 0 {
            self.emit(EventPayload::ExecutionsDeleted {
                execution_ids: ids.to_vec(),
            });
        }
        Ok(removed)
    }

    /// Latest version when the candidate matches it, else a freshly minted one.
    ///
    /// Detection and insert run under the template's lock. A conflicting
    /// writer outside this process triggers a retry with a refreshed latest.
    fn resolve_version(
        &self,
        template_id: TemplateId,
        text: &str,
        config: &ModelConfig,
    ) -> Result<(Version, bool), CoreError> {
        let attempts = self.config.execution.version_retry_limit.max(1);
        let lock = self.template_lock(template_id);
        for attempt in 1..=attempts {
            let _guard = lock.lock();
            let latest = self.store.latest_version(template_id)?;
            let decision = should_create_version(latest.as_ref(), text, config);
            if !decision.changed
                && let Some(latest) = latest
            {
                return Ok((latest, false));
            }

            let version = Version {
                id: Uuid::new_v4(),
                template_id,
                version_number: decision.next_version_number,
                template_text: text.to_string(),
                model_config: config.clone(),
                created_at: Utc::now(),
            };
            match self.store.insert_version(&version) {
                Ok(()) => {
                    info!(
                        "version minted (template_id={}, version={})",
                        template_id, version.version_number
                    );
                    self.emit(EventPayload::VersionCreated {
                        template_id,
                        version_id: version.id,
                        version_number: version.version_number,
                    });
                    return Ok((version, true));
                }
                Err(StoreError::VersionConflict { version_number, .. }) => {
                    warn!(
                        "version number taken, retrying (template_id={}, version={}, attempt={}/{})",
                        template_id, version_number, attempt, attempts
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(CoreError::VersionRetriesExhausted {
            template_id,
            attempts,
        })
    }
}

fn reject_empty(output: GenerationOutput) -> Result<GenerationOutput, GenerationError> {
    if output.output_text.is_empty() {
        Err(GenerationError::EmptyResponse)
    } else {
        Ok(output)
    }
}
