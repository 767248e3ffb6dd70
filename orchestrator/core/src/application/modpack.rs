// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Modpack Resolver
//!
//! Decides whether a modpack URL is worth handing to the runtime, and can
//! classify an archive (loader, game version, mod count) by scanning entry
//! names and an optional `manifest.json` entirely in memory.
//!
//! Nothing here ever holds the registry lock; every network call carries an
//! explicit timeout.

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use crate::domain::errors::ServerError;
use crate::domain::modpack::{ModpackInfo, ModpackMetadata, ModpackSource};
use crate::domain::validation::validate_modpack_url;

/// Upper bound on a `manifest.json` we are willing to parse.
const MAX_MANIFEST_BYTES: u64 = 1024 * 1024;

pub struct ModpackResolver {
    source: Arc<dyn ModpackSource>,
    head_timeout: Duration,
    max_archive_bytes: u64,
}

impl ModpackResolver {
    pub fn new(source: Arc<dyn ModpackSource>, head_timeout: Duration, max_archive_bytes: u64) -> Self {
        Self {
            source,
            head_timeout,
            max_archive_bytes,
        }
    }

    /// Syntax check, then a bounded HEAD request; the URL must answer 200 and
    /// look like a zip archive.
    pub async fn validate_and_describe(&self, url: &str) -> Result<ModpackInfo, ServerError> {
        if !validate_modpack_url(url) {
            return Err(ServerError::validation(
                "Invalid modpack URL. It must be an http(s) link to a .zip file.",
            ));
        }

        let head = match tokio::time::timeout(self.head_timeout, self.source.head(url)).await {
            Ok(Ok(head)) => head,
            Ok(Err(e)) => {
                warn!(url, "Modpack URL check failed: {}", e);
                return Err(ServerError::validation(format!(
                    "Modpack URL is not reachable: {}",
                    e
                )));
            }
            Err(_) => {
                warn!(url, "Modpack URL check timed out after {:?}", self.head_timeout);
                return Err(ServerError::validation(format!(
                    "Modpack URL did not answer within {}s.",
                    self.head_timeout.as_secs()
                )));
            }
        };

        if head.status != 200 {
            return Err(ServerError::validation(format!(
                "Modpack URL answered HTTP {} instead of 200.",
                head.status
            )));
        }

        if !head.looks_like_zip(url) {
            return Err(ServerError::validation("Modpack URL does not point to a zip archive."));
        }

        let info = ModpackInfo {
            url: url.to_string(),
            filename: head.filename(url),
            size_bytes: head.content_length,
            last_modified: head.last_modified.clone(),
        };
        info!(url, filename = %info.filename, size = ?info.size_bytes, "Modpack URL accepted");
        Ok(info)
    }

    /// Download and classify an archive. Any failure degrades to `None`.
    pub async fn inspect(&self, url: &str) -> Option<ModpackMetadata> {
        match self.source.download(url, self.max_archive_bytes).await {
            Ok(bytes) => {
                let metadata = extract_metadata(&bytes);
                debug!(url, ?metadata, "Modpack archive inspected");
                Some(metadata)
            }
            Err(e) => {
                warn!(url, "Could not download modpack for inspection: {}", e);
                None
            }
        }
    }
}

/// Classify a modpack archive from its entry names and optional manifest.
///
/// Unreadable archives yield default metadata; a broken manifest leaves the
/// name-based guesses in place.
pub fn extract_metadata(archive: &[u8]) -> ModpackMetadata {
    let mut metadata = ModpackMetadata::default();

    let mut zip = match zip::ZipArchive::new(Cursor::new(archive)) {
        Ok(zip) => zip,
        Err(e) => {
            warn!("Error reading modpack archive: {}", e);
            return metadata;
        }
    };

    let names: Vec<String> = zip.file_names().map(|n| n.replace('\\', "/")).collect();

    metadata.mod_count = names
        .iter()
        .filter(|n| n.ends_with(".jar") && (n.starts_with("mods/") || n.contains("/mods/")))
        .count();
    metadata.has_config = names
        .iter()
        .any(|n| n.starts_with("config/") || n.contains("/config/"));
    metadata.mod_loader = detect_loader(&names);

    if let Some(manifest_name) = names
        .iter()
        .find(|n| n.to_ascii_lowercase().ends_with("manifest.json"))
        .cloned()
    {
        if let Some(manifest) = read_manifest(&mut zip, &manifest_name) {
            apply_manifest(&mut metadata, &manifest);
        }
    }

    metadata
}

/// Longest keyword first: every NeoForge pack also matches "forge".
fn detect_loader(names: &[String]) -> Option<String> {
    ["neoforge", "forge", "fabric", "quilt"]
        .into_iter()
        .find(|loader| names.iter().any(|n| n.to_ascii_lowercase().contains(loader)))
        .map(str::to_string)
}

fn read_manifest<R: Read + std::io::Seek>(
    zip: &mut zip::ZipArchive<R>,
    name: &str,
) -> Option<serde_json::Value> {
    let entry = zip.by_name(name).ok()?;
    let mut content = String::new();
    entry.take(MAX_MANIFEST_BYTES).read_to_string(&mut content).ok()?;
    serde_json::from_str(&content).ok()
}

fn apply_manifest(metadata: &mut ModpackMetadata, manifest: &serde_json::Value) {
    let minecraft = manifest.get("minecraft");

    if let Some(version) = minecraft
        .and_then(|m| m.get("version"))
        .and_then(|v| v.as_str())
    {
        metadata.minecraft_version = Some(version.to_string());
    }

    // CurseForge nests modLoaders under "minecraft"; some exporters do not
    let loaders = minecraft
        .and_then(|m| m.get("modLoaders"))
        .or_else(|| manifest.get("modLoaders"))
        .and_then(|l| l.as_array());

    if let Some(id) = loaders
        .and_then(|l| l.first())
        .and_then(|l| l.get("id"))
        .and_then(|id| id.as_str())
    {
        let loader = id.split('-').next().unwrap_or(id);
        if !loader.is_empty() {
            metadata.mod_loader = Some(loader.to_string());
        }
    }
}
