// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Operator console
//!
//! Reads chat-style command lines (`!create_server survival vanilla`) from
//! stdin and runs them as the given caller. Paced log deliveries keep running
//! in the background while further commands are read.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use blockyard_core::{
    domain::{config::ManagerConfig, permissions::Caller},
    presentation::{Reply, ReplySink},
};

use crate::embedded::EmbeddedManager;

#[derive(Args, Debug)]
pub struct ConsoleArgs {
    /// Identity recorded as the creator of new servers
    #[arg(long, env = "BLOCKYARD_USER", default_value = "operator")]
    pub user: String,

    /// Comma-separated roles held by the caller
    #[arg(long, env = "BLOCKYARD_ROLES", value_delimiter = ',', default_value = "Admin")]
    pub roles: Vec<String>,
}

/// Prints replies to stdout.
pub struct StdoutSink;

#[async_trait]
impl ReplySink for StdoutSink {
    async fn send(&self, reply: Reply) -> Result<()> {
        match &reply {
            Reply::Text(text) if text.starts_with('❌') => println!("{}", text.red()),
            Reply::Text(text) if text.starts_with('✅') => println!("{}", text.green()),
            Reply::Text(text) => println!("{}", text),
            Reply::Embed(embed) => {
                println!("{}", embed.title.bold());
                if let Some(description) = &embed.description {
                    println!("{}", description);
                }
                for field in &embed.fields {
                    println!("  {}", field.name.bold());
                    for line in field.value.lines() {
                        println!("    {}", line);
                    }
                }
            }
        }
        Ok(())
    }
}

pub async fn run(args: ConsoleArgs, config_override: Option<PathBuf>) -> Result<()> {
    let config = ManagerConfig::load_or_default(config_override)
        .context("Failed to load configuration")?;
    let manager = EmbeddedManager::new(config).await?;
    let handler = manager.handler();

    let caller = Caller::new(args.user, args.roles.iter().map(|r| r.trim()).filter(|r| !r.is_empty()));
    let sink: Arc<dyn ReplySink> = Arc::new(StdoutSink);

    println!(
        "{}",
        format!(
            "Blockyard console as {} ({}). Type !list_templates to begin, 'quit' to exit.",
            caller.id,
            caller.roles.iter().cloned().collect::<Vec<_>>().join(", ")
        )
        .dimmed()
    );

    let mut deliveries = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }

        if let Some(task) = handler.handle_line(&caller, line, sink.clone()).await {
            deliveries.push(task);
        }
        deliveries.retain(|task| !task.is_finished());
    }

    debug!(pending = deliveries.len(), "Waiting for log deliveries to finish");
    for task in deliveries {
        if let Err(e) = task.await {
            warn!("Log delivery task failed: {}", e);
        }
    }

    Ok(())
}
