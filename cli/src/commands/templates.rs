// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Template document commands
//!
//! Commands: list, check

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use blockyard_core::{
    application::TemplateStore,
    domain::{config::ManagerConfig, repository::{DocumentStore, TemplateDocument}},
    infrastructure::JsonFileStore,
};

#[derive(Subcommand)]
pub enum TemplatesCommand {
    /// List templates in the template document
    List {
        /// Template document (default: storage.templates_file)
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Check every template for obvious mistakes
    Check {
        /// Template document (default: storage.templates_file)
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

pub async fn handle_command(
    command: TemplatesCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    let config = ManagerConfig::load_or_default(config_override)
        .context("Failed to load configuration")?;

    match command {
        TemplatesCommand::List { file } => {
            list(file.as_deref().unwrap_or(&config.storage.templates_file)).await
        }
        TemplatesCommand::Check { file } => {
            check(file.as_deref().unwrap_or(&config.storage.templates_file)).await
        }
    }
}

async fn list(path: &Path) -> Result<()> {
    let store = TemplateStore::load(&JsonFileStore::new(path)).await;

    if store.is_empty() {
        println!("{}", format!("No templates in {}", path.display()).yellow());
        return Ok(());
    }

    for template in store.list() {
        println!("{}", template.name.bold());
        if !template.description.is_empty() {
            println!("  {}", template.description);
        }
        println!("  Image: {}", template.image);
        println!("  Type: {}", template.server_type().unwrap_or("VANILLA"));
        println!("  Memory: {}", template.memory().unwrap_or("default"));
    }

    Ok(())
}

/// Returns the number of problems found across all templates.
pub async fn check_document(path: &Path) -> Result<usize> {
    let store = JsonFileStore::new(path);
    let document = DocumentStore::<TemplateDocument>::read(&store)
        .await
        .with_context(|| format!("Failed to parse {}", path.display()))?
        .with_context(|| format!("Template document not found: {}", path.display()))?;

    let store = TemplateStore::from_document(document);
    let mut problems = 0;
    for template in store.list() {
        let issues = template.sanity_issues();
        if issues.is_empty() {
            println!("{} {}", "✓".green(), template.name);
        } else {
            println!("{} {}", "✗".red(), template.name);
            for issue in &issues {
                println!("    {}", issue);
            }
            problems += issues.len();
        }
    }
    Ok(problems)
}

async fn check(path: &Path) -> Result<()> {
    let problems = check_document(path).await?;
    if problems > 0 {
        anyhow::bail!("{} template problem(s) found in {}", problems, path.display());
    }
    println!("{}", "✓ All templates look good".green());
    Ok(())
}
