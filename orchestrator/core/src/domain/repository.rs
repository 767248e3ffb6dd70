// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Document Persistence Contracts
//!
//! Templates and the server registry are each persisted as a single JSON
//! document that is read whole and rewritten whole. The contract lives here;
//! the file-backed implementation lives in
//! `crate::infrastructure::repositories`.
//!
//! | Document | Shape | Writer |
//! |----------|-------|--------|
//! | `TemplateDocument` | template name → `ServerTemplate` | operators, out-of-band |
//! | `RegistryDocument` | server name → `ServerRecord` | the lifecycle manager only |

use async_trait::async_trait;
use std::collections::BTreeMap;
use crate::domain::server::ServerRecord;
use crate::domain::template::ServerTemplate;

pub type TemplateDocument = BTreeMap<String, ServerTemplate>;
pub type RegistryDocument = BTreeMap<String, ServerRecord>;

/// Whole-document storage.
#[async_trait]
pub trait DocumentStore<T: Send + Sync>: Send + Sync {
    /// Read the document; `Ok(None)` when it does not exist yet.
    async fn read(&self) -> Result<Option<T>, RepositoryError>;

    /// Replace the document as one atomic unit.
    async fn write(&self, document: &T) -> Result<(), RepositoryError>;

    /// Where the document lives, for log messages.
    fn location(&self) -> String;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        RepositoryError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
