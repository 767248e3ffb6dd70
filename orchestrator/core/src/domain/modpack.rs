// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lightweight facts about a modpack archive, gathered without downloading it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModpackInfo {
    pub url: String,
    pub filename: String,
    pub size_bytes: Option<u64>,
    pub last_modified: Option<String>,
}

/// What an archive scan could classify. Every field may stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModpackMetadata {
    pub minecraft_version: Option<String>,
    pub mod_loader: Option<String>,
    pub mod_count: usize,
    pub has_config: bool,
}

/// Response headers of a HEAD request against a modpack URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModpackHead {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub content_length: Option<u64>,
    pub last_modified: Option<String>,
}

impl ModpackHead {
    /// Zip by content type, by `Content-Disposition` filename, or by URL suffix.
    pub fn looks_like_zip(&self, url: &str) -> bool {
        let content_type = self.content_type.as_deref().unwrap_or_default().to_ascii_lowercase();
        let disposition = self
            .content_disposition
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase();

        content_type.contains("application/zip")
            || content_type.contains("application/x-zip")
            || disposition.contains(".zip")
            || url.to_ascii_lowercase().ends_with(".zip")
    }

    /// `filename=` from `Content-Disposition`, else the last URL path segment.
    pub fn filename(&self, url: &str) -> String {
        if let Some(disposition) = &self.content_disposition {
            if let Some((_, tail)) = disposition.split_once("filename=") {
                let name = tail
                    .split(';')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .trim_matches(|c| c == '"' || c == '\'');
                if !name.is_empty() {
                    return name.to_string();
                }
            }
        }

        let path = url.split(['?', '#']).next().unwrap_or(url);
        path.rsplit('/').next().unwrap_or(path).to_string()
    }
}

#[derive(Debug, Error)]
pub enum ModpackError {
    #[error("Request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Archive at {url} exceeds the {limit} byte download limit")]
    TooLarge { url: String, limit: u64 },
}

/// Network collaborator that answers questions about modpack URLs.
#[async_trait]
pub trait ModpackSource: Send + Sync {
    async fn head(&self, url: &str) -> Result<ModpackHead, ModpackError>;

    /// Download the whole archive, refusing anything larger than `max_bytes`.
    async fn download(&self, url: &str, max_bytes: u64) -> Result<Bytes, ModpackError>;
}
