// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::application::delivery::chunk_text;
use crate::domain::errors::ServerError;
use crate::domain::modpack::{ModpackInfo, ModpackMetadata};
use crate::domain::permissions::Caller;
use crate::domain::runtime::ContainerId;
use crate::domain::server::{ServerRecord, ServerStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSummary {
    pub name: String,
    pub description: String,
    pub server_type: Option<String>,
    pub memory: Option<String>,
}

/// Operator input for `create_server`. `port` stays wide so out-of-range
/// values reach validation instead of failing to parse.
#[derive(Debug, Clone, Default)]
pub struct CreateServerRequest {
    pub name: String,
    pub template: String,
    pub port: Option<i64>,
    pub modpack_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatedServer {
    pub name: String,
    pub template_name: String,
    pub container_id: ContainerId,
    pub port: Option<u16>,
    pub status: ServerStatus,
    pub modpack: Option<ModpackInfo>,
    pub modpack_metadata: Option<ModpackMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSummary {
    pub name: String,
    pub template_name: String,
    pub status: ServerStatus,
    pub port: Option<u16>,
}

/// Megabytes, truncated to one decimal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryUsage {
    pub usage_mb: f64,
    pub limit_mb: f64,
}

#[derive(Debug, Clone)]
pub struct ServerDetails {
    pub name: String,
    pub template_name: String,
    pub status: ServerStatus,
    /// What the runtime said, verbatim (`running`, `exited`, ...)
    pub runtime_status: String,
    pub port: Option<u16>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub short_id: String,
    pub modpack_url: Option<String>,
    /// Only present while the container is running.
    pub memory: Option<MemoryUsage>,
}

#[derive(Debug, Clone)]
pub struct LogOutput {
    pub name: String,
    pub lines: u32,
    pub text: String,
}

impl LogOutput {
    pub fn chunks(&self, max_chars: usize) -> Vec<String> {
        chunk_text(&self.text, max_chars)
    }
}

/// Everything the command surface can ask of the server manager.
///
/// Every method takes the calling operator and checks permissions before it
/// touches the registry or the runtime.
#[async_trait]
pub trait ServerLifecycleService: Send + Sync {
    async fn list_templates(&self, caller: &Caller) -> Result<Vec<TemplateSummary>, ServerError>;

    async fn create_server(
        &self,
        caller: &Caller,
        request: CreateServerRequest,
    ) -> Result<CreatedServer, ServerError>;

    async fn start_server(&self, caller: &Caller, name: &str) -> Result<(), ServerError>;

    async fn stop_server(&self, caller: &Caller, name: &str) -> Result<(), ServerError>;

    async fn restart_server(&self, caller: &Caller, name: &str) -> Result<(), ServerError>;

    /// Returns the record that was deleted.
    async fn remove_server(&self, caller: &Caller, name: &str) -> Result<ServerRecord, ServerError>;

    async fn list_servers(&self, caller: &Caller) -> Result<Vec<ServerSummary>, ServerError>;

    async fn server_status(&self, caller: &Caller, name: &str) -> Result<ServerDetails, ServerError>;

    /// `lines` defaults to the configured value when `None`.
    async fn server_logs(
        &self,
        caller: &Caller,
        name: &str,
        lines: Option<i64>,
    ) -> Result<LogOutput, ServerError>;
}
