//! ZenMark CLI - offline-first markdown notes from the terminal
//!
//! Every command works against the local replica; `zenmark sync` reconciles
//! it with the remote store when one is configured.

mod cli;
mod commands;
mod config_profiles;
mod error;

#[cfg(test)]
mod tests;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::common::{resolve_db_path, CliContext};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::{run_edit, run_tag};
use crate::commands::folder::run_folder;
use crate::commands::list::run_list;
use crate::commands::move_doc::run_move;
use crate::commands::search::run_search;
use crate::commands::show::run_show;
use crate::commands::sync::run_sync;
use crate::commands::versions::{run_checkpoint, run_history, run_rollback};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "zenmark=info".parse() {
        filter = filter.add_directive(directive);
    }
    // stdout carries command output, including --json
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let context = CliContext {
        db_path: resolve_db_path(cli.db_path),
        profile: cli.profile,
    };

    match cli.command {
        Some(Commands::New { title, folder }) => {
            run_add(&title, folder.as_deref(), &context).await?;
        }
        Some(Commands::List {
            limit,
            folder,
            json,
        }) => run_list(limit, folder.as_deref(), json, &context).await?,
        Some(Commands::Search { query, limit, json }) => {
            run_search(&query, limit, json, &context).await?;
        }
        Some(Commands::Show { id, json }) => run_show(&id, json, &context).await?,
        Some(Commands::Edit { id, title }) => run_edit(&id, title, &context).await?,
        Some(Commands::Tag { id, tags }) => run_tag(&id, &tags, &context).await?,
        Some(Commands::Delete { id }) => run_delete(&id, &context).await?,
        Some(Commands::Move { id, to }) => run_move(&id, to.as_deref(), &context).await?,
        Some(Commands::Checkpoint { id }) => run_checkpoint(&id, &context).await?,
        Some(Commands::History { id, json }) => run_history(&id, json, &context).await?,
        Some(Commands::Rollback { id, version }) => run_rollback(&id, version, &context).await?,
        Some(Commands::Folder { command }) => run_folder(command, &context).await?,
        Some(Commands::Sync { command }) => run_sync(command, &context).await?,
        Some(Commands::Config { command }) => run_config(command, &context)?,
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        None => {
            // Quick create: zenmark "Document title"
            if cli.title.is_empty() {
                Cli::command().print_help().map_err(CliError::Io)?;
                println!();
            } else {
                run_add(&cli.title, None, &context).await?;
            }
        }
    }

    Ok(())
}
