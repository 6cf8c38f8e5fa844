mod commands;
mod notifier;
mod render;
mod settings;

use anyhow::{Context, Result};
use buildinfra::editor::EditorMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use commands::apply::handle_apply;
use commands::delete::handle_delete;
use commands::edit::handle_edit;
use commands::list::handle_list;
use commands::show::handle_show;
use settings::Settings;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Orchestrator URL (can also be set via BUILDINFRA_ORCHESTRATOR__HOST)
    #[arg(long, global = true)]
    host: Option<String>,

    /// API token (can also be set via BUILDINFRA_ORCHESTRATOR__TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List build infra profiles
    List,

    /// Print a profile with the values it inherits
    Show {
        #[arg(default_value = "default")]
        name: String,
    },

    /// Create a profile interactively
    Create,

    /// Edit a profile interactively
    Edit {
        #[arg(default_value = "default")]
        name: String,
    },

    /// Apply a YAML list of edits to a profile and save it
    Apply {
        name: String,

        /// File with the edits to apply
        #[arg(short, long)]
        file: PathBuf,

        /// Create the profile instead of editing an existing one
        #[arg(long)]
        create: bool,
    },

    /// Delete a profile
    Delete {
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = Settings::new().context("Failed to load settings")?;
    let mut config = settings.orchestrator.client_config();
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(token) = cli.token {
        config.token = Some(token);
    }
    if let Some(timeout) = cli.timeout {
        config.timeout = Duration::from_secs(timeout);
    }

    match cli.command {
        Command::List => handle_list(config).await,
        Command::Show { name } => handle_show(config, &name).await,
        Command::Create => handle_edit(config, EditorMode::Create).await,
        Command::Edit { name } => handle_edit(config, EditorMode::Edit(name)).await,
        Command::Apply { name, file, create } => handle_apply(config, &name, &file, create).await,
        Command::Delete { name, yes } => handle_delete(config, &name, yes).await,
    }
}
