// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Server Templates
//!
//! A template is a named, reusable blueprint for a game-server container:
//! image, environment, default port/volume bindings and restart policy.
//! Templates are read-only while the process runs; operators edit the
//! backing document out-of-band.
//!
//! ```json
//! {
//!   "vanilla": {
//!     "image": "itzg/minecraft-server:latest",
//!     "description": "Plain survival server",
//!     "environment": { "EULA": "TRUE", "TYPE": "VANILLA", "MEMORY": "2G" },
//!     "ports": { "25565/tcp": null },
//!     "volumes": {},
//!     "restart_policy": { "Name": "unless-stopped" }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::domain::validation::{validate_memory_spec, validate_minecraft_version};

/// Port the game listens on inside the container when a template declares none.
pub const DEFAULT_GAME_PORT: &str = "25565/tcp";

/// Environment key the runtime image reads to pick the server flavour.
pub const ENV_SERVER_TYPE: &str = "TYPE";
pub const ENV_MEMORY: &str = "MEMORY";
pub const ENV_VERSION: &str = "VERSION";

/// Restart policy in the runtime's own document shape (`{"Name": ...}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartPolicySpec {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(
        rename = "MaximumRetryCount",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub maximum_retry_count: Option<i64>,
}

impl Default for RestartPolicySpec {
    fn default() -> Self {
        Self {
            name: "unless-stopped".to_string(),
            maximum_retry_count: None,
        }
    }
}

/// An extra volume declared by the template, keyed by volume name or host path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVolume {
    pub bind: String,
    #[serde(default = "default_volume_mode")]
    pub mode: String,
}

fn default_volume_mode() -> String {
    "rw".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerTemplate {
    /// Document key; not stored inside the entry itself.
    #[serde(skip)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub image: String,

    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    #[serde(default)]
    pub ports: BTreeMap<String, Option<u16>>,

    #[serde(default)]
    pub volumes: BTreeMap<String, TemplateVolume>,

    #[serde(default)]
    pub restart_policy: RestartPolicySpec,

    /// Fields this version does not model, kept so a rewrite is lossless.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ServerTemplate {
    /// Declared server flavour (`VANILLA`, `FORGE`, `PAPER`, ...), if any.
    pub fn server_type(&self) -> Option<&str> {
        self.environment.get(ENV_SERVER_TYPE).map(String::as_str)
    }

    pub fn memory(&self) -> Option<&str> {
        self.environment.get(ENV_MEMORY).map(String::as_str)
    }

    /// The container port the game listens on and its default host binding.
    /// The standard game port wins when declared; otherwise the first listed.
    pub fn game_port(&self) -> (String, Option<u16>) {
        if let Some(host) = self.ports.get(DEFAULT_GAME_PORT) {
            return (DEFAULT_GAME_PORT.to_string(), *host);
        }
        self.ports
            .iter()
            .next()
            .map(|(port, host)| (port.clone(), *host))
            .unwrap_or_else(|| (DEFAULT_GAME_PORT.to_string(), None))
    }

    /// Problems worth warning an operator about. Templates with issues are
    /// still loaded; the runtime has the final word on what it accepts.
    pub fn sanity_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.image.trim().is_empty() {
            issues.push("image is empty".to_string());
        }

        if let Some(memory) = self.memory() {
            if !validate_memory_spec(memory) {
                issues.push(format!("MEMORY '{}' is not a memory spec like 2G or 512M", memory));
            }
        }

        if let Some(version) = self.environment.get(ENV_VERSION) {
            let symbolic = matches!(version.to_ascii_uppercase().as_str(), "LATEST" | "SNAPSHOT");
            if !symbolic && !validate_minecraft_version(version) {
                issues.push(format!("VERSION '{}' is not a Minecraft version", version));
            }
        }

        issues
    }
}
