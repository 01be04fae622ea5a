//! # flockmesh
//!
//! Command-line interface for FlockMesh's control-plane crates, exercising
//! every library operation against a directory of JSON fixtures:
//! - `flockmesh policy evaluate/simulate/patch/rollback/export-history`
//! - `flockmesh blueprint preview/lint/remediate`

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use config::Workspace;

#[derive(Parser)]
#[command(name = "flockmesh", version, about)]
struct Cli {
    /// Fixture workspace directory (defaults to the current directory).
    #[arg(long, default_value = ".")]
    workspace_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate, simulate, patch, roll back, or export policy history.
    Policy {
        #[command(subcommand)]
        command: commands::policy::PolicyCommands,
    },
    /// Build and inspect agent blueprints.
    Blueprint {
        #[command(subcommand)]
        command: commands::blueprint::BlueprintCommands,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let workspace = Workspace::load(&cli.workspace_root)?;

    match &cli.command {
        Commands::Policy { command } => commands::policy::execute(command, &workspace),
        Commands::Blueprint { command } => commands::blueprint::execute(command, &workspace),
    }
}
