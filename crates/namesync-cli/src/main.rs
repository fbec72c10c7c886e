//! namesync CLI
//!
//! Command-line and terminal interface for a shared, live-updating list of
//! names.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use namesync_core::{Config, HttpTransport, SortMode};

mod commands;
mod output;
mod tui;

use output::{Output, OutputFormat};

/// Environment variable that enables logging (value is the level)
pub const LOG_ENV: &str = "NAMESYNC_LOG";

#[derive(Parser)]
#[command(name = "namesync")]
#[command(about = "namesync - a shared list of names, kept in sync live")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the TUI interface
    Tui,
    /// Print the server greeting
    Greet,
    /// Add a name
    Add {
        /// Name to add (at least 2 characters)
        name: String,
    },
    /// List all names
    #[command(alias = "ls")]
    List {
        /// Sort order (date-asc, date-desc, name-asc, name-desc)
        #[arg(short, long)]
        sort: Option<SortMode>,
    },
    /// Rename every entry called OLD
    Rename {
        /// Current name
        old: String,
        /// New name (at least 2 characters)
        new: String,
    },
    /// Delete all names
    Clear,
    /// Print every snapshot pushed by the server until it closes
    Watch,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (api_url, ws_url, request_timeout_secs,
        /// snapshot_fallback_ms, default_sort, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work even when the stored config is broken
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    let command = cli.command.unwrap_or(Commands::Tui);
    if matches!(command, Commands::Tui) {
        return tui::run(config).await;
    }

    init_cli_logging();

    let transport = HttpTransport::from_config(&config).context("Invalid backend address")?;

    match command {
        Commands::Greet => commands::names::greet(&transport, &output).await,
        Commands::Add { name } => commands::names::add(&transport, &name, &output).await,
        Commands::List { sort } => {
            commands::names::list(&transport, sort.unwrap_or(config.default_sort), &output).await
        }
        Commands::Rename { old, new } => {
            commands::names::rename(&transport, &old, &new, &output).await
        }
        Commands::Clear => commands::names::clear(&transport, &output).await,
        Commands::Watch => commands::watch::watch(&transport, &output).await,
        Commands::Tui | Commands::Config { .. } => Ok(()),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(&key, &value, config_path, output)
        }
    }
}

/// Initialize stderr logging for one-shot commands
///
/// Only initializes if NAMESYNC_LOG is set; its value is the level.
fn init_cli_logging() {
    let Ok(log_level) = std::env::var(LOG_ENV) else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "namesync_core={},namesync={}",
        log_level, log_level
    ));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
