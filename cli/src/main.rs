//! `campus` command-line client: inspect an entity's files and stage uploads
//! against the campus API.

#![expect(clippy::exit)]

mod cli;
mod commands;
mod output;
mod timing;
mod utils;

use anyhow::{Context as _, Result};
use campus_business::{BusinessConfig, Submitter};
use clap::Parser as _;

use crate::cli::{Cli, Commands};
use crate::commands::{generate_completions, run_files, run_upload};
use crate::output::Output;

fn submitter() -> Result<Submitter> {
    let config = BusinessConfig::from_env().context("Invalid CAMPUS_* environment")?;
    log::debug!("api_url={}", config.api_url());
    Ok(Submitter::new(config))
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Files { entity, id } => {
            run_files(&submitter()?, entity, &id).await?;
        }
        Commands::Upload(args) => {
            run_upload(&submitter()?, args).await?;
        }
        Commands::Completions { shell } => generate_completions(shell),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    timing::init_tracing(cli.verbose, cli.timing);

    if let Err(e) = run(cli).await {
        Output::new().error(format!("{e:#}"));
        std::process::exit(1);
    }
}
