//! `murmur` -- CLI binary for the murmur voice-assistant host.
//!
//! Provides the following subcommands:
//!
//! - `murmur start` -- Discover modules, merge configuration, run both
//!   registration phases, and serve until interrupted.
//! - `murmur modules` -- List discovered modules.
//! - `murmur config` -- Print the resolved merged configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

/// murmur voice-assistant host CLI.
#[derive(Parser)]
#[command(name = "murmur", about = "murmur voice-assistant host", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Root config file path (overrides the MURMUR_CONFIG env var).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory scanned for module subdirectories.
    #[arg(long, global = true, default_value = "modules")]
    modules_root: PathBuf,

    /// Optional user override config, merged last.
    #[arg(long, global = true)]
    user_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Start the host: discover, merge, register, serve.
    Start,

    /// List discovered modules.
    Modules,

    /// Print the resolved merged configuration as JSON.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let options = commands::HostOptions {
        modules_root: cli.modules_root,
        root_config_path: commands::resolve_root_config(cli.config),
        user_config_path: cli.user_config,
    };

    match cli.command {
        Commands::Start => commands::start::run(&options).await?,
        Commands::Modules => commands::modules_cmd::run(&options)?,
        Commands::Config => commands::config_cmd::run(&options)?,
    }

    Ok(())
}
