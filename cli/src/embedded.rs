// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-process service wiring
//!
//! Builds the lifecycle service, its documents and its runtime adapters from a
//! [`ManagerConfig`], so commands can run without any separate daemon.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use blockyard_core::{
    application::{ModpackResolver, ServerRegistry, StandardServerLifecycleService, TemplateStore},
    domain::{config::ManagerConfig, runtime::GameRuntime},
    infrastructure::{DockerRuntime, HttpModpackSource, JsonFileStore},
    presentation::CommandHandler,
};

pub struct EmbeddedManager {
    service: Arc<StandardServerLifecycleService>,
    config: ManagerConfig,
}

impl EmbeddedManager {
    /// Connect to Docker and load both documents.
    pub async fn new(config: ManagerConfig) -> Result<Self> {
        let docker = DockerRuntime::new(
            config.runtime.docker_host.as_deref(),
            config.runtime.stop_timeout_secs,
        )
        .context("Failed to initialize Docker runtime")?;

        docker
            .healthcheck()
            .await
            .context("Docker daemon is not reachable")?;

        Self::with_runtime(config, Arc::new(docker)).await
    }

    pub async fn with_runtime(config: ManagerConfig, runtime: Arc<dyn GameRuntime>) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;

        let templates = TemplateStore::load(&JsonFileStore::new(&config.storage.templates_file)).await;
        let registry =
            ServerRegistry::load(Arc::new(JsonFileStore::new(&config.storage.servers_file))).await;

        let modpacks = ModpackResolver::new(
            Arc::new(HttpModpackSource::new(
                config.modpack.head_timeout(),
                config.modpack.download_timeout(),
            )),
            config.modpack.head_timeout(),
            config.modpack.max_archive_bytes,
        );

        info!(
            templates = templates.len(),
            servers = registry.len(),
            "Server manager ready"
        );

        let service = Arc::new(StandardServerLifecycleService::new(
            runtime, templates, registry, modpacks, &config,
        ));

        Ok(Self { service, config })
    }

    pub fn service(&self) -> Arc<StandardServerLifecycleService> {
        self.service.clone()
    }

    pub fn handler(&self) -> CommandHandler {
        CommandHandler::new(self.service.clone(), &self.config.logs)
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }
}
