// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Template Store
//!
//! Read-only view of the template document. Loading never fails: a missing
//! or malformed document leaves the store empty and is reported in the log.

use std::collections::BTreeMap;
use tracing::{error, info, warn};
use crate::domain::repository::{DocumentStore, RepositoryError, TemplateDocument};
use crate::domain::template::ServerTemplate;

#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: BTreeMap<String, ServerTemplate>,
}

impl TemplateStore {
    pub async fn load(store: &dyn DocumentStore<TemplateDocument>) -> Self {
        let document = match store.read().await {
            Ok(Some(document)) => document,
            Ok(None) => {
                error!("Templates file not found: {}", store.location());
                TemplateDocument::new()
            }
            Err(e) => {
                error!("Error parsing templates file {}: {}", store.location(), e);
                TemplateDocument::new()
            }
        };

        let loaded = Self::from_document(document);
        info!("Loaded {} server template(s) from {}", loaded.len(), store.location());
        loaded
    }

    pub fn from_document(document: TemplateDocument) -> Self {
        let templates = document
            .into_iter()
            .map(|(name, mut template)| {
                template.name = name.clone();
                for issue in template.sanity_issues() {
                    warn!(template = %name, "Template issue: {}", issue);
                }
                (name, template)
            })
            .collect();

        Self { templates }
    }

    pub fn get(&self, name: &str) -> Result<&ServerTemplate, RepositoryError> {
        self.templates
            .get(name)
            .ok_or_else(|| RepositoryError::NotFound(format!("template '{}'", name)))
    }

    /// Templates in name order.
    pub fn list(&self) -> impl Iterator<Item = &ServerTemplate> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
