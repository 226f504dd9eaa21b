//! `promptvault` command-line entry point.

mod cli;
mod commands;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use log::{debug, info};
use promptvault_config::PromptVaultConfig;
use promptvault_core::{PromptService, build_generator, open_store};
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    promptvault::init_logging();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let store = open_store(&config.storage).context("failed to open catalog store")?;
    let mut service = PromptService::new(config.clone(), store);
    if matches!(&cli.command, Command::Run(args) if !args.preview) {
        let generator =
            build_generator(&config.provider).context("failed to build text generator")?;
        info!(
            "text generator ready (provider={:?}, base_url={})",
            config.provider.kind, config.provider.base_url
        );
        service = service.with_generator(generator);
    }
    commands::run(service, cli).await
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PromptVaultConfig> {
    if let Some(path) = path {
        info!("loading config from path: {}", path.display());
        return PromptVaultConfig::load_from_path(path).context("failed to load config");
    }
    let cwd = std::env::current_dir().context("cwd")?;
    let layered = PromptVaultConfig::load_layered(&cwd).context("failed to load layered config")?;
    debug!("layered config loaded (layers={})", layered.layers.len());
    Ok(layered.config)
}
