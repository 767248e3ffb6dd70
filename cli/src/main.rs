// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Blockyard CLI
//!
//! The `blockyard` binary runs the game-server manager in-process.
//!
//! ## Commands
//!
//! - `blockyard console` - Read `!command` lines from stdin and run them
//! - `blockyard templates list|check` - Inspect the template document
//! - `blockyard config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use blockyard::commands::{self, ConfigCommand, ConsoleArgs, TemplatesCommand};
use blockyard_core::domain::config::ManagerConfig;

/// Blockyard - Minecraft servers on demand for chat operators
#[derive(Parser)]
#[command(name = "blockyard")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "BLOCKYARD_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to `logging.level`
    #[arg(long, global = true, env = "LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive operator console
    #[command(name = "console")]
    Console(ConsoleArgs),

    /// Template document tools
    #[command(name = "templates")]
    Templates {
        #[command(subcommand)]
        command: TemplatesCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    let level = resolve_log_level(cli.log_level.as_deref(), cli.config.clone());
    init_logging(&level)?;

    match cli.command {
        Some(Commands::Console(args)) => commands::console::run(args, cli.config).await,
        Some(Commands::Templates { command }) => {
            commands::templates::handle_command(command, cli.config).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Flag or `LOG_LEVEL` first, then the configured `logging.level`. A config
/// that fails to load here is reported again by the command that needs it.
fn resolve_log_level(flag: Option<&str>, config_path: Option<PathBuf>) -> String {
    if let Some(level) = flag {
        return level.to_string();
    }
    ManagerConfig::load_or_default(config_path)
        .map(|config| config.logging.level)
        .unwrap_or_else(|_| "info".to_string())
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_level_falls_back_to_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, "logging:\n  level: debug\n").unwrap();

        assert_eq!(resolve_log_level(None, Some(path.clone())), "debug");
        assert_eq!(resolve_log_level(Some("warn"), Some(path)), "warn");
    }

    #[test]
    fn test_log_level_defaults_when_config_is_unreadable() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("absent.yaml");
        assert_eq!(resolve_log_level(None, Some(missing)), "info");
    }
}
