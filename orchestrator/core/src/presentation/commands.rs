// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Chat command surface
//!
//! Parses `!command arg ...` lines into [`Command`]s, runs them against a
//! [`ServerLifecycleService`], and formats the outcome as [`Reply`] payloads.
//! Long log output is handed to a paced background delivery task.

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::application::delivery::{deliver_paced, ChunkSink};
use crate::application::server::{
    CreateServerRequest, CreatedServer, LogOutput, ServerDetails, ServerLifecycleService,
    ServerSummary, TemplateSummary,
};
use crate::domain::config::LogsConfig;
use crate::domain::errors::ServerError;
use crate::domain::permissions::Caller;
use crate::domain::server::ServerStatus;
use crate::presentation::reply::{Embed, EmbedColor, Reply, ReplySink};

const COMMAND_PREFIX: char = '!';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ListTemplates,
    CreateServer {
        name: String,
        template: String,
        port: Option<i64>,
        modpack_url: Option<String>,
    },
    ListServers,
    StartServer { name: String },
    StopServer { name: String },
    RestartServer { name: String },
    RemoveServer { name: String },
    ServerLogs { name: String, lines: Option<i64> },
    ServerStatus { name: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}'")]
    Unknown(String),

    #[error("Missing argument <{argument}>. Usage: {usage}")]
    MissingArgument { argument: &'static str, usage: &'static str },

    #[error("Invalid value '{value}' for <{argument}>")]
    InvalidArgument { argument: &'static str, value: String },

    #[error("Too many arguments. Usage: {0}")]
    TooManyArguments(&'static str),
}

impl Command {
    pub const NAMES: [&'static str; 9] = [
        "list_templates",
        "create_server",
        "list_servers",
        "start_server",
        "stop_server",
        "restart_server",
        "remove_server",
        "server_logs",
        "server_status",
    ];

    /// Parse one command line. The leading `!` is optional.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut tokens = line.split_whitespace();
        let head = tokens.next().ok_or(CommandError::Empty)?;
        let name = head.strip_prefix(COMMAND_PREFIX).unwrap_or(head);
        let args: Vec<&str> = tokens.collect();
        Self::from_parts(name, &args)
    }

    /// Build a command from an already-split name and argument list.
    pub fn from_parts(name: &str, args: &[&str]) -> Result<Self, CommandError> {
        let usage = usage(name).ok_or_else(|| CommandError::Unknown(name.to_string()))?;
        let mut args = Arguments { args, next: 0, usage };

        let command = match name {
            "list_templates" => Self::ListTemplates,
            "list_servers" => Self::ListServers,
            "create_server" => {
                let name = args.required("name")?;
                let template = args.required("template")?;
                // Port is optional; a URL in third position is the modpack
                let (port, modpack_url) = match args.optional() {
                    Some(value) if value.starts_with("http://") || value.starts_with("https://") => {
                        (None, Some(value.to_string()))
                    }
                    Some(value) => (
                        Some(parse_number("port", value)?),
                        args.optional().map(str::to_string),
                    ),
                    None => (None, None),
                };
                Self::CreateServer {
                    name,
                    template,
                    port,
                    modpack_url,
                }
            }
            "start_server" => Self::StartServer { name: args.required("name")? },
            "stop_server" => Self::StopServer { name: args.required("name")? },
            "restart_server" => Self::RestartServer { name: args.required("name")? },
            "remove_server" => Self::RemoveServer { name: args.required("name")? },
            "server_status" => Self::ServerStatus { name: args.required("name")? },
            "server_logs" => {
                let name = args.required("name")?;
                let lines = args.optional().map(|v| parse_number("lines", v)).transpose()?;
                Self::ServerLogs { name, lines }
            }
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        args.finish()?;
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ListTemplates => "list_templates",
            Self::CreateServer { .. } => "create_server",
            Self::ListServers => "list_servers",
            Self::StartServer { .. } => "start_server",
            Self::StopServer { .. } => "stop_server",
            Self::RestartServer { .. } => "restart_server",
            Self::RemoveServer { .. } => "remove_server",
            Self::ServerLogs { .. } => "server_logs",
            Self::ServerStatus { .. } => "server_status",
        }
    }
}

pub fn usage(command: &str) -> Option<&'static str> {
    Some(match command {
        "list_templates" => "!list_templates",
        "create_server" => "!create_server <name> <template> [port] [modpack_url]",
        "list_servers" => "!list_servers",
        "start_server" => "!start_server <name>",
        "stop_server" => "!stop_server <name>",
        "restart_server" => "!restart_server <name>",
        "remove_server" => "!remove_server <name>",
        "server_logs" => "!server_logs <name> [lines]",
        "server_status" => "!server_status <name>",
        _ => return None,
    })
}

struct Arguments<'a> {
    args: &'a [&'a str],
    next: usize,
    usage: &'static str,
}

impl<'a> Arguments<'a> {
    fn optional(&mut self) -> Option<&'a str> {
        let value = self.args.get(self.next).copied();
        self.next += usize::from(value.is_some());
        value
    }

    fn required(&mut self, argument: &'static str) -> Result<String, CommandError> {
        self.optional()
            .map(str::to_string)
            .ok_or(CommandError::MissingArgument { argument, usage: self.usage })
    }

    fn finish(&self) -> Result<(), CommandError> {
        if self.next < self.args.len() {
            return Err(CommandError::TooManyArguments(self.usage));
        }
        Ok(())
    }
}

fn parse_number(argument: &'static str, value: &str) -> Result<i64, CommandError> {
    value.parse().map_err(|_| CommandError::InvalidArgument {
        argument,
        value: value.to_string(),
    })
}

/// Wraps each log chunk in a code block before it reaches the chat.
struct CodeBlockSink {
    replies: Arc<dyn ReplySink>,
}

#[async_trait]
impl ChunkSink for CodeBlockSink {
    async fn send_chunk(&self, chunk: String) -> anyhow::Result<()> {
        self.replies.send(Reply::code_block(&chunk)).await
    }
}

pub struct CommandHandler {
    service: Arc<dyn ServerLifecycleService>,
    chunk_chars: usize,
    chunk_delay: Duration,
}

impl CommandHandler {
    pub fn new(service: Arc<dyn ServerLifecycleService>, logs: &LogsConfig) -> Self {
        Self {
            service,
            chunk_chars: logs.chunk_chars,
            chunk_delay: logs.chunk_delay(),
        }
    }

    /// Parse and run one line. Returns the log delivery task, if one was started.
    pub async fn handle_line(
        &self,
        caller: &Caller,
        line: &str,
        sink: Arc<dyn ReplySink>,
    ) -> Option<JoinHandle<usize>> {
        match Command::parse(line) {
            Ok(command) => self.handle(caller, command, sink).await,
            Err(e) => {
                send(&sink, Reply::text(format!("❌ {}", e))).await;
                None
            }
        }
    }

    pub async fn handle(
        &self,
        caller: &Caller,
        command: Command,
        sink: Arc<dyn ReplySink>,
    ) -> Option<JoinHandle<usize>> {
        info!(caller = %caller.id, command = command.name(), "Handling command");

        let outcome = match command {
            Command::ListTemplates => self.service.list_templates(caller).await.map(templates_reply),
            Command::CreateServer {
                name,
                template,
                port,
                modpack_url,
            } => {
                if modpack_url.is_some() {
                    send(&sink, Reply::text(format!("⏳ Checking modpack and creating server '{}'...", name))).await;
                }
                let request = CreateServerRequest {
                    name,
                    template,
                    port,
                    modpack_url,
                };
                self.service.create_server(caller, request).await.map(created_reply)
            }
            Command::ListServers => self.service.list_servers(caller).await.map(servers_reply),
            Command::StartServer { name } => self
                .service
                .start_server(caller, &name)
                .await
                .map(|_| Reply::success(format!("Server '{}' started.", name))),
            Command::StopServer { name } => self
                .service
                .stop_server(caller, &name)
                .await
                .map(|_| Reply::success(format!("Server '{}' stopped.", name))),
            Command::RestartServer { name } => self
                .service
                .restart_server(caller, &name)
                .await
                .map(|_| Reply::success(format!("Server '{}' restarted.", name))),
            Command::RemoveServer { name } => self
                .service
                .remove_server(caller, &name)
                .await
                .map(|_| Reply::success(format!("Server '{}' removed.", name))),
            Command::ServerStatus { name } => self.service.server_status(caller, &name).await.map(status_reply),
            Command::ServerLogs { name, lines } => {
                return match self.service.server_logs(caller, &name, lines).await {
                    Ok(output) => self.deliver_logs(output, sink).await,
                    Err(e) => {
                        send(&sink, Reply::failure(&e)).await;
                        None
                    }
                };
            }
        };

        send(&sink, outcome.unwrap_or_else(|e: ServerError| Reply::failure(&e))).await;
        None
    }

    async fn deliver_logs(&self, output: LogOutput, sink: Arc<dyn ReplySink>) -> Option<JoinHandle<usize>> {
        if output.text.trim().is_empty() {
            send(&sink, Reply::text(format!("No logs available for '{}'.", output.name))).await;
            return None;
        }

        send(
            &sink,
            Reply::text(format!("📋 Last {} lines of '{}':", output.lines, output.name)),
        )
        .await;

        let chunks = output.chunks(self.chunk_chars);
        let chunk_sink = Arc::new(CodeBlockSink { replies: sink });
        Some(deliver_paced(chunk_sink, chunks, self.chunk_delay))
    }
}

async fn send(sink: &Arc<dyn ReplySink>, reply: Reply) {
    if let Err(e) = sink.send(reply).await {
        warn!("Failed to send reply: {}", e);
    }
}

fn status_icon(status: ServerStatus) -> &'static str {
    match status {
        ServerStatus::Running => "🟢",
        ServerStatus::Stopped => "🔴",
        ServerStatus::Created => "🟡",
        ServerStatus::NotFound | ServerStatus::Error => "⚠️",
    }
}

fn port_label(port: Option<u16>) -> String {
    port.map(|p| p.to_string()).unwrap_or_else(|| "auto".to_string())
}

fn templates_reply(templates: Vec<TemplateSummary>) -> Reply {
    if templates.is_empty() {
        return Reply::text("No templates available.");
    }

    let embed = templates.into_iter().fold(
        Embed::new("Available Server Templates", EmbedColor::Blue),
        |embed, t| {
            let value = format!(
                "{}\nType: {}\nMemory: {}",
                if t.description.is_empty() { "No description" } else { t.description.as_str() },
                t.server_type.as_deref().unwrap_or("VANILLA"),
                t.memory.as_deref().unwrap_or("default"),
            );
            embed.field(t.name, value, false)
        },
    );
    Reply::Embed(embed)
}

fn created_reply(created: CreatedServer) -> Reply {
    let mut embed = Embed::new("✅ Server Created", EmbedColor::Green)
        .field("Name", created.name.as_str(), true)
        .field("Template", created.template_name.as_str(), true)
        .field("Port", port_label(created.port), true)
        .field("Status", created.status.as_str(), true)
        .field("Container ID", created.container_id.short(), true);

    if let Some(modpack) = &created.modpack {
        let size = modpack
            .size_bytes
            .map(|b| format!("{:.1} MB", b as f64 / (1024.0 * 1024.0)))
            .unwrap_or_else(|| "unknown size".to_string());
        embed = embed.field("Modpack", format!("{} ({})", modpack.filename, size), false);
    }

    if let Some(metadata) = &created.modpack_metadata {
        embed = embed.field(
            "Modpack Contents",
            format!(
                "Loader: {}\nMinecraft: {}\nMods: {}",
                metadata.mod_loader.as_deref().unwrap_or("unknown"),
                metadata.minecraft_version.as_deref().unwrap_or("unknown"),
                metadata.mod_count
            ),
            false,
        );
    }

    Reply::Embed(embed)
}

fn servers_reply(servers: Vec<ServerSummary>) -> Reply {
    if servers.is_empty() {
        return Reply::text("No servers found.");
    }

    let embed = servers.into_iter().fold(
        Embed::new("Minecraft Servers", EmbedColor::Blue),
        |embed, s| {
            embed.field(
                format!("{} {}", status_icon(s.status), s.name),
                format!(
                    "Template: {}\nStatus: {}\nPort: {}",
                    s.template_name,
                    s.status,
                    port_label(s.port)
                ),
                true,
            )
        },
    );
    Reply::Embed(embed)
}

fn status_reply(details: ServerDetails) -> Reply {
    let mut embed = Embed::new(
        format!("Server Status: {}", details.name),
        EmbedColor::for_status(details.status),
    )
    .field("Status", details.runtime_status.as_str(), true)
    .field("Template", details.template_name.as_str(), true)
    .field("Port", port_label(details.port), true)
    .field("Created by", details.created_by.as_str(), true)
    .field("Created at", details.created_at.format("%Y-%m-%d %H:%M UTC").to_string(), true)
    .field(
        "Container ID",
        if details.short_id.is_empty() { "none" } else { details.short_id.as_str() },
        true,
    );

    if let Some(memory) = details.memory {
        embed = embed.field(
            "Memory",
            format!("{:.1} MB / {:.1} MB", memory.usage_mb, memory.limit_mb),
            true,
        );
    }

    if let Some(url) = &details.modpack_url {
        embed = embed.field("Modpack", url.as_str(), false);
    }

    Reply::Embed(embed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("!list_servers").unwrap(), Command::ListServers);
        assert_eq!(Command::parse("list_templates").unwrap(), Command::ListTemplates);
        assert_eq!(
            Command::parse("!stop_server survival").unwrap(),
            Command::StopServer { name: "survival".to_string() }
        );
    }

    #[test]
    fn test_parse_create_variants() {
        assert_eq!(
            Command::parse("!create_server survival vanilla").unwrap(),
            Command::CreateServer {
                name: "survival".to_string(),
                template: "vanilla".to_string(),
                port: None,
                modpack_url: None,
            }
        );
        assert_eq!(
            Command::parse("!create_server modded forge 25570 https://x.io/p.zip").unwrap(),
            Command::CreateServer {
                name: "modded".to_string(),
                template: "forge".to_string(),
                port: Some(25570),
                modpack_url: Some("https://x.io/p.zip".to_string()),
            }
        );
        assert_eq!(
            Command::parse("!create_server modded forge https://x.io/p.zip").unwrap(),
            Command::CreateServer {
                name: "modded".to_string(),
                template: "forge".to_string(),
                port: None,
                modpack_url: Some("https://x.io/p.zip".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_logs_lines() {
        assert_eq!(
            Command::parse("!server_logs survival 150").unwrap(),
            Command::ServerLogs { name: "survival".to_string(), lines: Some(150) }
        );
        assert_eq!(
            Command::parse("!server_logs survival").unwrap(),
            Command::ServerLogs { name: "survival".to_string(), lines: None }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Command::parse("   "), Err(CommandError::Empty));
        assert_eq!(Command::parse("!dance"), Err(CommandError::Unknown("dance".to_string())));
        assert!(matches!(
            Command::parse("!start_server"),
            Err(CommandError::MissingArgument { argument: "name", .. })
        ));
        assert!(matches!(
            Command::parse("!server_logs survival lots"),
            Err(CommandError::InvalidArgument { argument: "lines", .. })
        ));
        assert!(matches!(
            Command::parse("!list_servers extra"),
            Err(CommandError::TooManyArguments(_))
        ));
    }

    #[test]
    fn test_every_command_has_usage() {
        for name in Command::NAMES {
            assert!(usage(name).is_some(), "{} has no usage line", name);
        }
    }
}
