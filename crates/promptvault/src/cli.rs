//! Command-line definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// Versioned prompt templates with execution history.
#[derive(Debug, Parser)]
#[command(name = "promptvault", version)]
pub struct Cli {
    /// Use this promptvault.json5 instead of the layered config
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage catalog fragments
    #[command(subcommand)]
    Fragment(FragmentCommand),
    /// Manage templates
    #[command(subcommand)]
    Template(TemplateCommand),
    /// Show a template's variables with their prefilled values
    Vars(VarsArgs),
    /// Render a template without calling the provider
    Render(RenderArgs),
    /// Render, call the provider, and record the execution
    Run(RunArgs),
    /// Show versions and executions of a template
    History(HistoryArgs),
    /// Manage recorded executions
    #[command(subcommand)]
    Executions(ExecutionsCommand),
    /// List selectable models
    Models,
}

#[derive(Debug, Subcommand)]
pub enum FragmentCommand {
    /// Add a fragment; content `(a|b|c)` defines options
    Add {
        #[arg(long)]
        label: String,
        #[arg(long, default_value = "general")]
        category: String,
        content: String,
    },
    /// List fragments, newest first
    List,
    /// Edit a fragment
    Update {
        id: Uuid,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete a fragment
    Rm { id: Uuid },
}

#[derive(Debug, Subcommand)]
pub enum TemplateCommand {
    /// Create a template; its text and config become version 1
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[command(flatten)]
        text: TextSource,
        #[command(flatten)]
        model: ModelArgs,
        /// Fragment to link (repeatable)
        #[arg(long = "fragment")]
        fragments: Vec<Uuid>,
    },
    /// List templates, newest first
    List,
    /// Show a template with its latest version and linked fragments
    Show { id: Uuid },
    /// Replace the template's linked fragments (none clears them)
    Link { id: Uuid, fragments: Vec<Uuid> },
    /// Delete a template with its whole history
    Rm { id: Uuid },
}

#[derive(Debug, Subcommand)]
pub enum ExecutionsCommand {
    /// Delete executions by id
    Rm {
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
}

/// Template text given inline or read from a file.
#[derive(Debug, Clone, Default, Args)]
pub struct TextSource {
    /// Template text
    #[arg(long, conflicts_with = "file")]
    pub text: Option<String>,
    /// Read template text from a file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

/// Model settings; unset values keep the latest version's config.
#[derive(Debug, Clone, Default, Args)]
pub struct ModelArgs {
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub temperature: Option<f64>,
    #[arg(long)]
    pub max_tokens: Option<u32>,
}

/// Where variable values come from.
#[derive(Debug, Clone, Default, Args)]
pub struct VariableArgs {
    /// Variable value as name=value (repeatable)
    #[arg(long = "var", value_parser = parse_key_value)]
    pub vars: Vec<(String, String)>,
    /// Start from the values of the latest execution
    #[arg(long)]
    pub reuse_last: bool,
    /// Selected option for a fragment as fragment_id=option (repeatable)
    #[arg(long = "select", value_parser = parse_selection)]
    pub selections: Vec<(Uuid, String)>,
}

#[derive(Debug, Args)]
pub struct VarsArgs {
    pub template: Uuid,
    #[command(flatten)]
    pub text: TextSource,
    #[command(flatten)]
    pub variables: VariableArgs,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    pub template: Uuid,
    #[command(flatten)]
    pub text: TextSource,
    #[command(flatten)]
    pub variables: VariableArgs,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    pub template: Uuid,
    #[command(flatten)]
    pub text: TextSource,
    #[command(flatten)]
    pub model: ModelArgs,
    #[command(flatten)]
    pub variables: VariableArgs,
    /// Only report whether this run would create a new version
    #[arg(long)]
    pub preview: bool,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    pub template: Uuid,
    /// Group executions by rendered prompt, model, and temperature
    #[arg(long)]
    pub grouped: bool,
}

/// Parse `name=value`; the value may contain further `=`.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing name in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_selection(raw: &str) -> Result<(Uuid, String), String> {
    let (id, option) = parse_key_value(raw)?;
    let id = Uuid::parse_str(&id).map_err(|err| format!("invalid fragment id `{id}`: {err}"))?;
    Ok((id, option))
}
