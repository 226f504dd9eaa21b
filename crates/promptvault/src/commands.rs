//! Command handlers.

use crate::cli::{
    Cli, Command, ExecutionsCommand, FragmentCommand, HistoryArgs, ModelArgs, RenderArgs, RunArgs,
    TemplateCommand, TextSource, VariableArgs, VarsArgs,
};
use anyhow::{Context, bail};
use log::debug;
use promptvault_core::{
    ExecuteRequest, FragmentUpdate, NewFragment, NewTemplate, PromptService, render, unresolved,
};
use promptvault_protocol::{ModelConfig, TemplateId};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;

/// Longest prompt excerpt printed in listings.
const EXCERPT_CHARS: usize = 60;

/// Prints either JSON or human-readable text.
struct Output {
    json: bool,
}

impl Output {
    fn show<T: Serialize>(&self, value: &T, human: impl FnOnce() -> String) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", human());
        }
        Ok(())
    }
}

/// Execute the parsed command against the service.
pub async fn run(service: PromptService, cli: Cli) -> anyhow::Result<()> {
    let out = Output { json: cli.json };
    match cli.command {
        Command::Fragment(command) => fragment(&service, &out, command),
        Command::Template(command) => template(&service, &out, command),
        Command::Vars(args) => vars(&service, &out, args),
        Command::Render(args) => render_template(&service, &out, args),
        Command::Run(args) => run_template(&service, &out, args).await,
        Command::History(args) => history(&service, &out, args),
        Command::Executions(ExecutionsCommand::Rm { ids }) => {
            let removed = service.delete_executions(&ids)?;
            out.show(&json!({ "deleted": removed }), || {
                format!("deleted {removed} of {} executions", ids.len())
            })
        }
        Command::Models => {
            let models = service.model_catalog();
            out.show(&models, || {
                models
                    .iter()
                    .map(|entry| {
                        if entry.default {
                            format!("{} (default)", entry.name)
                        } else {
                            entry.name.clone()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
    }
}

fn fragment(service: &PromptService, out: &Output, command: FragmentCommand) -> anyhow::Result<()> {
    match command {
        FragmentCommand::Add {
            label,
            category,
            content,
        } => {
            let fragment = service.add_fragment(NewFragment {
                label,
                category,
                content,
            })?;
            out.show(&fragment, || format!("added fragment {}", fragment.id))
        }
        FragmentCommand::List => {
            let fragments = service.list_fragments()?;
            out.show(&fragments, || {
                fragments
                    .iter()
                    .map(|fragment| {
                        format!(
                            "{}  {:<16} {:<12} {}",
                            fragment.id, fragment.label, fragment.category, fragment.content
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        FragmentCommand::Update {
            id,
            label,
            category,
            content,
        } => {
            let fragment = service.update_fragment(
                id,
                FragmentUpdate {
                    label,
                    category,
                    content,
                },
            )?;
            out.show(&fragment, || format!("updated fragment {}", fragment.id))
        }
        FragmentCommand::Rm { id } => {
            let deleted = service.delete_fragment(id)?;
            if !deleted {
                bail!("fragment not found: {id}");
            }
            out.show(&json!({ "deleted": id }), || format!("deleted fragment {id}"))
        }
    }
}

fn template(service: &PromptService, out: &Output, command: TemplateCommand) -> anyhow::Result<()> {
    match command {
        TemplateCommand::Create {
            name,
            description,
            text,
            model,
            fragments,
        } => {
            let Some(template_text) = read_text(&text)? else {
                bail!("template text is required (--text or --file)");
            };
            let (template, version) = service.create_template(NewTemplate {
                name,
                description,
                template_text,
                model_config: apply_model_args(default_model_config(service), &model),
                fragment_ids: fragments.into_iter().collect(),
            })?;
            out.show(&json!({ "template": template, "version": version }), || {
                format!("created template {} (version 1)", template.id)
            })
        }
        TemplateCommand::List => {
            let templates = service.list_templates()?;
            out.show(&templates, || {
                templates
                    .iter()
                    .map(|template| format!("{}  {}", template.id, template.name))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        TemplateCommand::Show { id } => {
            let template = service.get_template(id)?;
            let latest = service.latest_version(id)?;
            let fragments = service.linked_fragments(id)?;
            let value = json!({ "template": template, "latest_version": latest, "fragments": fragments });
            out.show(&value, || {
                let mut lines = vec![format!("{}  {}", template.id, template.name)];
                if let Some(description) = &template.description {
                    lines.push(description.clone());
                }
                if let Some(version) = &latest {
                    lines.push(format!(
                        "version {} ({})",
                        version.version_number,
                        version.model_config.canonical_json()
                    ));
                    lines.push(version.template_text.clone());
                }
                for fragment in &fragments {
                    lines.push(format!("fragment {}: {}", fragment.label, fragment.content));
                }
                lines.join("\n")
            })
        }
        TemplateCommand::Link { id, fragments } => {
            let ids: BTreeSet<_> = fragments.into_iter().collect();
            let template = service.link_fragments(id, ids)?;
            out.show(&template, || {
                format!(
                    "template {} now links {} fragments",
                    template.id,
                    template.fragment_refs.len()
                )
            })
        }
        TemplateCommand::Rm { id } => {
            if !service.delete_template(id)? {
                bail!("template not found: {id}");
            }
            out.show(&json!({ "deleted": id }), || format!("deleted template {id}"))
        }
    }
}

fn vars(service: &PromptService, out: &Output, args: VarsArgs) -> anyhow::Result<()> {
    let text = text_or_latest(service, args.template, &args.text)?;
    let previous = previous_values(service, args.template, &args.variables)?;
    let selections = args.variables.selections.iter().cloned().collect();
    let slots = service.prepare_variables(args.template, Some(&text), &previous, &selections)?;
    out.show(&slots, || {
        slots
            .iter()
            .map(|slot| {
                let source = slot.fragment_label.as_deref().unwrap_or("-");
                if slot.options.is_empty() {
                    format!("{:<20} {:<16} {}", slot.name, source, slot.value)
                } else {
                    format!(
                        "{:<20} {:<16} {} [{}]",
                        slot.name,
                        source,
                        slot.value,
                        slot.options.join("|")
                    )
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}

fn render_template(service: &PromptService, out: &Output, args: RenderArgs) -> anyhow::Result<()> {
    let text = text_or_latest(service, args.template, &args.text)?;
    let values = collect_values(service, args.template, &text, &args.variables)?;
    let rendered = render(&text, &values);
    let missing = unresolved(&text, &values);
    out.show(
        &json!({ "rendered": rendered, "unresolved": missing }),
        || {
            if missing.is_empty() {
                rendered.clone()
            } else {
                format!("{rendered}\n\nunresolved: {}", missing.join(", "))
            }
        },
    )
}

async fn run_template(service: &PromptService, out: &Output, args: RunArgs) -> anyhow::Result<()> {
    let latest = service.latest_version(args.template)?;
    let text = match read_text(&args.text)? {
        Some(text) => text,
        None => latest
            .as_ref()
            .map(|version| version.template_text.clone())
            .context("template has no version; pass --text or --file")?,
    };
    let base_config = latest
        .map(|version| version.model_config)
        .unwrap_or_default();
    let model_config = apply_model_args(base_config, &args.model);

    if args.preview {
        let decision = service.preview_version(args.template, &text, &model_config)?;
        return out.show(&decision, || {
            if decision.changed {
                format!("this run will create version {}", decision.next_version_number)
            } else {
                format!("this run reuses version {}", decision.next_version_number)
            }
        });
    }

    let variables = collect_values(service, args.template, &text, &args.variables)?;
    debug!(
        "running template (template_id={}, variables={})",
        args.template,
        variables.len()
    );
    let outcome = service
        .execute(ExecuteRequest {
            template_id: args.template,
            template_text: text,
            model_config,
            variables,
        })
        .await?;
    out.show(&outcome, || {
        let note = if outcome.version_created {
            " (new)"
        } else {
            ""
        };
        format!(
            "{}\n\nversion {}{}  latency={}ms  tokens={}  execution={}",
            outcome.execution.ai_output,
            outcome.version.version_number,
            note,
            outcome.execution.latency_ms,
            outcome.execution.tokens_total,
            outcome.execution.id
        )
    })
}

fn history(service: &PromptService, out: &Output, args: HistoryArgs) -> anyhow::Result<()> {
    if args.grouped {
        let groups = service.grouped_history(args.template)?;
        return out.show(&groups, || {
            let mut lines = Vec::new();
            for (idx, group) in groups.iter().enumerate() {
                lines.push(format!(
                    "[{}] {}  model={} temperature={}  variations={}",
                    idx + 1,
                    excerpt(&group.rendered_prompt),
                    group.model_config.model.as_deref().unwrap_or("unknown"),
                    group
                        .model_config
                        .temperature
                        .map(|temperature| temperature.to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                    group.variations.len()
                ));
                for entry in &group.variations {
                    lines.push(format!(
                        "    {}  v{}  {}  {}",
                        entry.execution.id,
                        entry.version_number,
                        entry.execution.created_at.format("%Y-%m-%d %H:%M:%S"),
                        excerpt(&entry.execution.ai_output)
                    ));
                }
            }
            lines.join("\n")
        });
    }

    let history = service.history(args.template)?;
    out.show(&history, || {
        let mut lines = Vec::new();
        for entry in &history {
            lines.push(format!(
                "version {}  {}  {}",
                entry.version.version_number,
                entry.version.created_at.format("%Y-%m-%d %H:%M:%S"),
                entry.version.model_config.canonical_json()
            ));
            for execution in &entry.executions {
                lines.push(format!(
                    "    {}  {}  latency={}ms tokens={}  {}",
                    execution.id,
                    execution.created_at.format("%Y-%m-%d %H:%M:%S"),
                    execution.latency_ms,
                    execution.tokens_total,
                    excerpt(&execution.rendered_prompt)
                ));
            }
        }
        lines.join("\n")
    })
}

/// Text from `--text` or `--file`, if either was given.
fn read_text(source: &TextSource) -> anyhow::Result<Option<String>> {
    if let Some(text) = &source.text {
        return Ok(Some(text.clone()));
    }
    match &source.file {
        Some(path) => fs::read_to_string(path)
            .map(Some)
            .with_context(|| format!("failed to read template file {}", path.display())),
        None => Ok(None),
    }
}

fn text_or_latest(
    service: &PromptService,
    template_id: TemplateId,
    source: &TextSource,
) -> anyhow::Result<String> {
    if let Some(text) = read_text(source)? {
        return Ok(text);
    }
    service
        .latest_version(template_id)?
        .map(|version| version.template_text)
        .context("template has no version; pass --text or --file")
}

fn previous_values(
    service: &PromptService,
    template_id: TemplateId,
    args: &VariableArgs,
) -> anyhow::Result<BTreeMap<String, String>> {
    if args.reuse_last {
        Ok(service.last_variables(template_id)?)
    } else {
        Ok(BTreeMap::new())
    }
}

/// Seeded values with `--var` overrides applied.
///
/// Slots without a value are left out so their tokens stay visible.
fn collect_values(
    service: &PromptService,
    template_id: TemplateId,
    text: &str,
    args: &VariableArgs,
) -> anyhow::Result<BTreeMap<String, String>> {
    let previous = previous_values(service, template_id, args)?;
    let selections = args.selections.iter().cloned().collect();
    let mut values: BTreeMap<String, String> = service
        .prepare_variables(template_id, Some(text), &previous, &selections)?
        .into_iter()
        .filter(|slot| !slot.value.is_empty())
        .map(|slot| (slot.name, slot.value))
        .collect();
    values.extend(args.vars.iter().cloned());
    Ok(values)
}

/// Config for a new template: the configured default model and temperature.
fn default_model_config(service: &PromptService) -> ModelConfig {
    let config = service.config();
    ModelConfig::new(config.default_model(), config.defaults.temperature)
}

pub(crate) fn apply_model_args(mut config: ModelConfig, args: &ModelArgs) -> ModelConfig {
    if let Some(model) = &args.model {
        config.model = Some(model.clone());
    }
    if let Some(temperature) = args.temperature {
        config.temperature = Some(temperature);
    }
    if let Some(max_tokens) = args.max_tokens {
        config.max_tokens = Some(max_tokens);
    }
    config
}

fn excerpt(text: &str) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= EXCERPT_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn model_args_override_only_given_fields() {
        let base = ModelConfig::new("gpt-4o", 0.7).with_max_tokens(100);
        let config = apply_model_args(
            base,
            &ModelArgs {
                model: None,
                temperature: Some(0.1),
                max_tokens: None,
            },
        );
        assert_eq!(config.model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.temperature, Some(0.1));
        assert_eq!(config.max_tokens, Some(100));
    }

    #[test]
    fn excerpts_are_single_line_and_bounded() {
        assert_eq!(excerpt("a\nb"), "a b");
        let long = "x".repeat(EXCERPT_CHARS + 5);
        assert_eq!(excerpt(&long).chars().count(), EXCERPT_CHARS + 3);
    }
}
