// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Server Records
//!
//! The registry's unit of state: one logical game server, the template it was
//! built from, and the container the runtime created for it.
//!
//! # Status state machine
//!
//! ```text
//! absent ──create──▶ created ──▶ running ⇄ stopped ──remove──▶ (deleted)
//!                         ╲          │         │
//!                          ╲─────────┴─────────┴──▶ not_found / error
//! ```
//!
//! `not_found` and `error` are observations overlaid on a record whenever the
//! runtime disagrees with the registry; the record is kept until an operator
//! removes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use crate::domain::runtime::ContainerId;

/// Deserialization goes through [`ServerStatus::from_runtime`], so documents
/// holding a raw runtime status such as `exited` still load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    Created,
    Running,
    Stopped,
    NotFound,
    Error,
}

impl ServerStatus {
    /// Map a raw runtime status string onto the registry's coarser view.
    pub fn from_runtime(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "created" => Self::Created,
            "running" | "restarting" => Self::Running,
            "exited" | "paused" | "dead" | "stopped" => Self::Stopped,
            "not_found" => Self::NotFound,
            _ => Self::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::NotFound => "not_found",
            Self::Error => "error",
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::NotFound | Self::Error)
    }
}

impl<'de> Deserialize<'de> for ServerStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_runtime(&raw))
    }
}

impl Default for ServerStatus {
    fn default() -> Self {
        Self::Created
    }
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    /// Registry key; not stored inside the entry itself.
    #[serde(skip)]
    pub name: String,

    pub template_name: String,

    /// Host port; `None` means the runtime assigned one.
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub created_by: String,

    #[serde(default = "Utc::now", with = "iso8601")]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub status: ServerStatus,

    /// Empty until the runtime has created the container.
    #[serde(default)]
    pub container_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modpack_url: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ServerRecord {
    pub fn new(
        name: impl Into<String>,
        template_name: impl Into<String>,
        port: Option<u16>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            template_name: template_name.into(),
            port,
            created_by: created_by.into(),
            created_at: Utc::now(),
            status: ServerStatus::Created,
            container_id: String::new(),
            modpack_url: None,
            extra: BTreeMap::new(),
        }
    }

    /// The container backing this record, if creation got that far.
    pub fn container(&self) -> Option<ContainerId> {
        if self.container_id.is_empty() {
            None
        } else {
            Some(ContainerId::new(self.container_id.clone()))
        }
    }
}

/// RFC 3339 on write; on read also accepts naive ISO-8601 timestamps without
/// an offset (interpreted as UTC), which older registry documents contain.
mod iso8601 {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp '{}'", raw)))
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_runtime() {
        assert_eq!(ServerStatus::from_runtime("running"), ServerStatus::Running);
        assert_eq!(ServerStatus::from_runtime("exited"), ServerStatus::Stopped);
        assert_eq!(ServerStatus::from_runtime("created"), ServerStatus::Created);
        assert_eq!(ServerStatus::from_runtime("removing"), ServerStatus::Error);
    }

    #[test]
    fn test_record_document_shape() {
        let mut record = ServerRecord::new("survival", "vanilla", None, "steve#0001");
        record.container_id = "abc123".to_string();
        record.status = ServerStatus::Running;

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["template_name"], "vanilla");
        assert!(value["port"].is_null());
        assert_eq!(value["status"], "running");
        assert_eq!(value["container_id"], "abc123");
        assert!(value.get("modpack_url").is_none());
        assert!(value.get("name").is_none());
    }

    #[test]
    fn test_naive_timestamp_is_read_as_utc() {
        let record: ServerRecord = serde_json::from_str(
            r#"{
                "template_name": "vanilla",
                "port": 25570,
                "created_by": "alex",
                "created_at": "2024-03-01T12:30:45.123456",
                "status": "stopped",
                "container_id": "deadbeef"
            }"#,
        )
        .unwrap();

        assert_eq!(record.created_at.to_rfc3339(), "2024-03-01T12:30:45.123456+00:00");
        assert_eq!(record.status, ServerStatus::Stopped);
        assert_eq!(record.port, Some(25570));
    }

    #[test]
    fn test_raw_runtime_status_is_read_leniently() {
        let status: ServerStatus = serde_json::from_str(r#""exited""#).unwrap();
        assert_eq!(status, ServerStatus::Stopped);

        let status: ServerStatus = serde_json::from_str(r#""removing""#).unwrap();
        assert_eq!(status, ServerStatus::Error);

        let status: ServerStatus = serde_json::from_str(r#""not_found""#).unwrap();
        assert_eq!(status, ServerStatus::NotFound);

        // Written back in the registry's own vocabulary
        assert_eq!(serde_json::to_value(ServerStatus::Stopped).unwrap(), "stopped");
    }

    #[test]
    fn test_container_is_none_until_created() {
        let mut record = ServerRecord::new("survival", "vanilla", None, "alex");
        assert!(record.container().is_none());
        record.container_id = "abc".to_string();
        assert_eq!(record.container().unwrap().as_str(), "abc");
    }
}
