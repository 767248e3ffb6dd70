// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use blockyard_core::domain::config::{ManagerConfig, CONFIG_PATH_ENV};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./blockyard-config.yaml)
        #[arg(short, long, default_value = "./blockyard-config.yaml")]
        output: PathBuf,

        /// Include every key with comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ManagerConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./blockyard-config.yaml");
        println!("  4. ~/.blockyard/config.yaml");
        println!("  5. /etc/blockyard/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Permissions:".bold());
    println!("  Allowed roles: {}", config.permissions.allowed_roles.join(", "));
    println!();

    println!("{}", "Storage:".bold());
    println!("  Templates: {}", config.storage.templates_file.display());
    println!("  Servers: {}", config.storage.servers_file.display());
    println!();

    println!("{}", "Runtime:".bold());
    println!(
        "  Docker host: {}",
        config.runtime.docker_host.as_deref().unwrap_or("(local default)")
    );
    println!("  Container prefix: {}", config.runtime.container_prefix);
    println!("  Data mount: {}", config.runtime.data_mount);
    println!("  Stop timeout: {}s", config.runtime.stop_timeout_secs);
    println!();

    println!("{}", "Modpacks:".bold());
    println!("  HEAD timeout: {}s", config.modpack.head_timeout_secs);
    println!("  Inspect archives: {}", config.modpack.inspect_archives);
    println!();

    println!("{}", "Logging:".bold());
    println!("  Level: {}", config.logging.level);
    println!();

    println!("{}", "Logs:".bold());
    println!(
        "  Lines: default {}, max {}",
        config.logs.default_lines, config.logs.max_lines
    );
    println!(
        "  Chunks: {} chars, {}ms apart",
        config.logs.chunk_chars, config.logs.chunk_delay_ms
    );
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ManagerConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_samples_parse_and_validate() {
        for sample in [
            include_str!("../../templates/config-minimal.yaml"),
            include_str!("../../templates/config-with-examples.yaml"),
        ] {
            let config = ManagerConfig::from_yaml_str(sample).unwrap();
            config.validate().unwrap();
            assert_eq!(config.logs.chunk_chars, 1900);
        }
    }

    #[tokio::test]
    async fn test_generate_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("blockyard-config.yaml");
        generate(output.clone(), true).await.unwrap();

        let config = ManagerConfig::from_yaml_file(&output).unwrap();
        assert_eq!(config.runtime.container_prefix, "minecraft_");
    }
}
