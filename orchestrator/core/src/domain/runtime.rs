// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use crate::domain::template::RestartPolicySpec;

/// Length of the abbreviated container identifier shown to operators.
pub const SHORT_ID_LEN: usize = 12;

/// Opaque identifier the container runtime assigned to a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First twelve characters, the form `docker ps` prints.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(SHORT_ID_LEN) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named volume (or host path) mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeBind {
    pub source: String,
    pub target: String,
    /// `rw` or `ro`
    pub mode: String,
}

impl VolumeBind {
    /// Docker `binds` entry: `source:target:mode`.
    pub fn to_bind_string(&self) -> String {
        format!("{}:{}:{}", self.source, self.target, self.mode)
    }
}

/// Everything the runtime needs to create a game-server container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub image: String,
    pub name: String,
    pub env: BTreeMap<String, String>,
    /// Container port (`25565/tcp`) to host port; `None` lets the runtime pick.
    pub ports: BTreeMap<String, Option<u16>>,
    pub volumes: Vec<VolumeBind>,
    pub detach: bool,
    pub restart_policy: RestartPolicySpec,
}

/// What the runtime reports about a single container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHandle {
    pub id: ContainerId,
    pub name: String,
    /// Raw runtime status string (`created`, `running`, `exited`, ...)
    pub status: String,
}

/// Raw memory counters for a running container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStats {
    pub memory_usage_bytes: u64,
    pub memory_limit_bytes: u64,
}

/// Errors that can occur during runtime operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Failed to create container: {0}")]
    SpawnFailed(String),

    #[error("Container not found: {0}")]
    InstanceNotFound(String),

    #[error("Runtime operation failed: {0}")]
    OperationFailed(String),

    #[error("Cannot connect to container runtime: {0}")]
    ConnectionFailed(String),
}

impl RuntimeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::InstanceNotFound(_))
    }
}

/// The container engine the lifecycle manager drives.
///
/// Implemented by [`crate::infrastructure::runtime::DockerRuntime`] in
/// production and by in-memory fakes in tests. Every call is keyed by the
/// opaque [`ContainerId`] the runtime handed out on `create`.
#[async_trait]
pub trait GameRuntime: Send + Sync {
    /// Create (but do not start) a container.
    async fn create(&self, spec: &ContainerSpec) -> Result<ContainerHandle, RuntimeError>;

    async fn start(&self, id: &ContainerId) -> Result<(), RuntimeError>;

    async fn stop(&self, id: &ContainerId) -> Result<(), RuntimeError>;

    async fn restart(&self, id: &ContainerId) -> Result<(), RuntimeError>;

    /// Remove a stopped container. Named volumes are kept.
    async fn remove(&self, id: &ContainerId) -> Result<(), RuntimeError>;

    /// Look a container up; `InstanceNotFound` when the runtime has no such id.
    async fn get(&self, id: &ContainerId) -> Result<ContainerHandle, RuntimeError>;

    async fn status(&self, id: &ContainerId) -> Result<String, RuntimeError> {
        Ok(self.get(id).await?.status)
    }

    /// The last `tail` lines of combined stdout/stderr.
    async fn logs(&self, id: &ContainerId, tail: u32) -> Result<String, RuntimeError>;

    async fn stats(&self, id: &ContainerId) -> Result<ContainerStats, RuntimeError>;
}
