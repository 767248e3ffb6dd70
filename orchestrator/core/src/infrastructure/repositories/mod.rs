// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Document Store Implementations
//!
//! Infrastructure implementations of [`DocumentStore`]:
//!
//! - **JsonFileStore** - pretty-printed UTF-8 JSON on disk, replaced atomically
//!   (write to a sibling temporary file, then rename over the original)
//! - **InMemoryDocumentStore** - lock-protected value for tests and dry runs
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve whole documents
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use crate::domain::repository::{DocumentStore, RepositoryError};

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "document".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl<T> DocumentStore<T> for JsonFileStore
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn read(&self) -> Result<Option<T>, RepositoryError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let document = serde_json::from_str(&content)?;
        Ok(Some(document))
    }

    async fn write(&self, document: &T) -> Result<(), RepositoryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut json = serde_json::to_string_pretty(document)?;
        json.push('\n');

        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Holds the serialized JSON rather than the value, so reads and writes go
/// through the same serde path as the file store.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    content: Arc<RwLock<Option<String>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with raw document text (which may be malformed).
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Arc::new(RwLock::new(Some(content.into()))),
        }
    }

    pub fn content(&self) -> Option<String> {
        self.content.read().ok().and_then(|c| c.clone())
    }
}

#[async_trait]
impl<T> DocumentStore<T> for InMemoryDocumentStore
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn read(&self) -> Result<Option<T>, RepositoryError> {
        let content = self
            .content
            .read()
            .map_err(|_| RepositoryError::Io("document lock poisoned".to_string()))?
            .clone();

        match content {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn write(&self, document: &T) -> Result<(), RepositoryError> {
        let json = serde_json::to_string_pretty(document)?;
        let mut content = self
            .content
            .write()
            .map_err(|_| RepositoryError::Io("document lock poisoned".to_string()))?;
        *content = Some(json);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    type Doc = BTreeMap<String, u32>;

    #[tokio::test]
    async fn test_missing_file_reads_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path().join("absent.json"));

        let doc: Option<Doc> = store.read().await.unwrap();
        assert!(doc.is_none());
    }

    #[tokio::test]
    async fn test_write_creates_parents_and_replaces_whole_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data").join("servers.json");
        let store = JsonFileStore::new(&path);

        let first: Doc = BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 2)]);
        store.write(&first).await.unwrap();

        let second: Doc = BTreeMap::from([("c".to_string(), 3)]);
        store.write(&second).await.unwrap();

        let read: Option<Doc> = store.read().await.unwrap();
        assert_eq!(read, Some(second));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"c\": 3"));
        assert!(!temp_dir.path().join("data").join("servers.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_malformed_file_is_a_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        let result: Result<Option<Doc>, _> = store.read().await;
        assert!(matches!(result, Err(RepositoryError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryDocumentStore::new();
        let empty: Option<Doc> = store.read().await.unwrap();
        assert!(empty.is_none());

        let doc: Doc = BTreeMap::from([("x".to_string(), 9)]);
        store.write(&doc).await.unwrap();
        let read: Option<Doc> = store.read().await.unwrap();
        assert_eq!(read, Some(doc));
    }
}
