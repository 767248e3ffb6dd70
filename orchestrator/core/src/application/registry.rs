// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Server Registry
//!
//! The authoritative mapping of logical server name to [`ServerRecord`].
//! Mutations touch only the in-memory map; [`ServerRegistry::persist`] writes
//! the whole document back in one go. The lifecycle manager decides when to
//! persist and holds the registry behind a single lock while it does so.
//!
//! Besides records, the registry tracks *pending* names: servers whose
//! container is still being created. A pending name counts as taken, which is
//! what makes `create` name-exclusive while the runtime call is in flight.
//! Pending names are never persisted.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, warn};
use crate::domain::repository::{DocumentStore, RegistryDocument, RepositoryError};
use crate::domain::server::{ServerRecord, ServerStatus};

pub struct ServerRegistry {
    records: RegistryDocument,
    pending: BTreeSet<String>,
    store: Arc<dyn DocumentStore<RegistryDocument>>,
}

impl ServerRegistry {
    /// Load the registry document. Missing or malformed documents yield an
    /// empty registry; the malformed file is left untouched until the next
    /// successful persist replaces it.
    pub async fn load(store: Arc<dyn DocumentStore<RegistryDocument>>) -> Self {
        let records = match store.read().await {
            Ok(Some(records)) => records,
            Ok(None) => {
                debug!("No registry document at {}, starting empty", store.location());
                RegistryDocument::new()
            }
            Err(e) => {
                error!("Error parsing servers file {}: {}", store.location(), e);
                RegistryDocument::new()
            }
        };

        let records = records
            .into_iter()
            .map(|(name, mut record)| {
                record.name = name.clone();
                (name, record)
            })
            .collect();

        Self {
            records,
            pending: BTreeSet::new(),
            store,
        }
    }

    /// Write the full document.
    pub async fn persist(&self) -> Result<(), RepositoryError> {
        self.store.write(&self.records).await
    }

    pub fn get(&self, name: &str) -> Result<&ServerRecord, RepositoryError> {
        self.records
            .get(name)
            .ok_or_else(|| RepositoryError::NotFound(format!("server '{}'", name)))
    }

    /// Insert or replace the record stored under `record.name`.
    pub fn upsert(&mut self, record: ServerRecord) {
        self.records.insert(record.name.clone(), record);
    }

    pub fn remove(&mut self, name: &str) -> Result<ServerRecord, RepositoryError> {
        self.records
            .remove(name)
            .ok_or_else(|| RepositoryError::NotFound(format!("server '{}'", name)))
    }

    /// Update only the status field. Returns whether the status changed.
    pub fn reconcile_status(
        &mut self,
        name: &str,
        observed: ServerStatus,
    ) -> Result<bool, RepositoryError> {
        let record = self
            .records
            .get_mut(name)
            .ok_or_else(|| RepositoryError::NotFound(format!("server '{}'", name)))?;

        if record.status == observed {
            return Ok(false);
        }

        if observed.is_degraded() {
            warn!(
                server = %name,
                container = %record.container_id,
                "Registry says {} but runtime observation is {}",
                record.status,
                observed
            );
        }
        record.status = observed;
        Ok(true)
    }

    /// `true` if `name` has a record or a creation in flight.
    pub fn is_taken(&self, name: &str) -> bool {
        self.records.contains_key(name) || self.pending.contains(name)
    }

    /// Claim `name` for an in-flight creation. `false` if it is already taken.
    pub fn reserve(&mut self, name: &str) -> bool {
        if self.is_taken(name) {
            return false;
        }
        self.pending.insert(name.to_string())
    }

    pub fn release(&mut self, name: &str) {
        self.pending.remove(name);
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.pending.contains(name)
    }

    /// Records in name order.
    pub fn records(&self) -> impl Iterator<Item = &ServerRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
