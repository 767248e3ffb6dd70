// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Shared fixtures: an in-memory container runtime, a canned modpack source
//! and a fully wired lifecycle service.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use blockyard_core::application::{ModpackResolver, ServerRegistry, StandardServerLifecycleService, TemplateStore};
use blockyard_core::domain::config::ManagerConfig;
use blockyard_core::domain::modpack::{ModpackError, ModpackHead, ModpackSource};
use blockyard_core::domain::permissions::Caller;
use blockyard_core::domain::repository::{RegistryDocument, TemplateDocument};
use blockyard_core::domain::runtime::{
    ContainerHandle, ContainerId, ContainerSpec, ContainerStats, GameRuntime, RuntimeError,
};
use blockyard_core::infrastructure::InMemoryDocumentStore;

pub const TEMPLATES: &str = r#"{
    "vanilla": {
        "description": "Plain survival server",
        "image": "itzg/minecraft-server:latest",
        "environment": {"EULA": "TRUE", "TYPE": "VANILLA", "MEMORY": "2G"},
        "ports": {"25565/tcp": null},
        "volumes": {},
        "restart_policy": {"Name": "unless-stopped"}
    },
    "fabric": {
        "description": "Fabric with performance mods",
        "image": "itzg/minecraft-server:latest",
        "environment": {"EULA": "TRUE", "TYPE": "FABRIC", "MEMORY": "4G"},
        "ports": {"25565/tcp": 25570}
    }
}"#;

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub spec: ContainerSpec,
    pub status: String,
}

/// Runtime operations that can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Create,
    Start,
    Stop,
    Restart,
    Remove,
    Status,
    Logs,
    Stats,
}

#[derive(Default)]
pub struct FakeRuntime {
    containers: Mutex<BTreeMap<String, FakeContainer>>,
    calls: Mutex<Vec<Op>>,
    failing: Mutex<HashSet<Op>>,
    next_id: Mutex<u64>,
    create_delay: Mutex<Duration>,
    log_text: Mutex<String>,
    last_tail: Mutex<Option<u32>>,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn recover(&self, op: Op) {
        self.failing.lock().unwrap().remove(&op);
    }

    pub fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.lock().unwrap() = delay;
    }

    pub fn set_logs(&self, text: impl Into<String>) {
        *self.log_text.lock().unwrap() = text.into();
    }

    pub fn calls(&self) -> Vec<Op> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls().iter().filter(|c| **c == op).count()
    }

    pub fn last_tail(&self) -> Option<u32> {
        *self.last_tail.lock().unwrap()
    }

    pub fn container(&self, id: &str) -> Option<FakeContainer> {
        self.containers.lock().unwrap().get(id).cloned()
    }

    pub fn container_count(&self) -> usize {
        self.containers.lock().unwrap().len()
    }

    /// Simulate someone deleting the container behind our back.
    pub fn vanish(&self, id: &str) {
        self.containers.lock().unwrap().remove(id);
    }

    /// Simulate the container exiting on its own.
    pub fn set_status(&self, id: &str, status: &str) {
        if let Some(c) = self.containers.lock().unwrap().get_mut(id) {
            c.status = status.to_string();
        }
    }

    fn enter(&self, op: Op) -> Result<(), RuntimeError> {
        self.calls.lock().unwrap().push(op);
        if self.failing.lock().unwrap().contains(&op) {
            return Err(RuntimeError::OperationFailed(format!("{:?} refused by daemon", op)));
        }
        Ok(())
    }

    fn with_container<R>(
        &self,
        id: &ContainerId,
        f: impl FnOnce(&mut FakeContainer) -> R,
    ) -> Result<R, RuntimeError> {
        let mut containers = self.containers.lock().unwrap();
        containers
            .get_mut(id.as_str())
            .map(f)
            .ok_or_else(|| RuntimeError::InstanceNotFound(id.to_string()))
    }
}

#[async_trait]
impl GameRuntime for FakeRuntime {
    async fn create(&self, spec: &ContainerSpec) -> Result<ContainerHandle, RuntimeError> {
        self.enter(Op::Create)?;
        let delay = *self.create_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            format!("{:064x}", 0xabc0_0000_u64 + *next)
        };
        self.containers.lock().unwrap().insert(
            id.clone(),
            FakeContainer {
                spec: spec.clone(),
                status: "created".to_string(),
            },
        );
        Ok(ContainerHandle {
            id: ContainerId::new(id),
            name: spec.name.clone(),
            status: "created".to_string(),
        })
    }

    async fn start(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        self.enter(Op::Start)?;
        self.with_container(id, |c| c.status = "running".to_string())
    }

    async fn stop(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        self.enter(Op::Stop)?;
        self.with_container(id, |c| c.status = "exited".to_string())
    }

    async fn restart(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        self.enter(Op::Restart)?;
        self.with_container(id, |c| c.status = "running".to_string())
    }

    async fn remove(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        self.enter(Op::Remove)?;
        self.containers
            .lock()
            .unwrap()
            .remove(id.as_str())
            .map(|_| ())
            .ok_or_else(|| RuntimeError::InstanceNotFound(id.to_string()))
    }

    async fn get(&self, id: &ContainerId) -> Result<ContainerHandle, RuntimeError> {
        self.enter(Op::Status)?;
        self.with_container(id, |c| ContainerHandle {
            id: id.clone(),
            name: c.spec.name.clone(),
            status: c.status.clone(),
        })
    }

    async fn logs(&self, id: &ContainerId, tail: u32) -> Result<String, RuntimeError> {
        self.enter(Op::Logs)?;
        *self.last_tail.lock().unwrap() = Some(tail);
        self.with_container(id, |_| ())?;
        Ok(self.log_text.lock().unwrap().clone())
    }

    async fn stats(&self, id: &ContainerId) -> Result<ContainerStats, RuntimeError> {
        self.enter(Op::Stats)?;
        self.with_container(id, |_| ContainerStats {
            // 512.34 MiB of 2 GiB
            memory_usage_bytes: 537_227_264,
            memory_limit_bytes: 2 * 1024 * 1024 * 1024,
        })
    }
}

/// Answers every HEAD with a zip and refuses downloads.
pub struct CannedModpacks {
    pub status: u16,
}

#[async_trait]
impl ModpackSource for CannedModpacks {
    async fn head(&self, _url: &str) -> Result<ModpackHead, ModpackError> {
        Ok(ModpackHead {
            status: self.status,
            content_type: Some("application/zip".to_string()),
            content_length: Some(150 * 1024 * 1024),
            ..Default::default()
        })
    }

    async fn download(&self, url: &str, limit: u64) -> Result<Bytes, ModpackError> {
        Err(ModpackError::TooLarge {
            url: url.to_string(),
            limit,
        })
    }
}

pub fn admin() -> Caller {
    Caller::new("steve", ["Admin"])
}

pub fn nobody() -> Caller {
    Caller::new("alex", Vec::<String>::new())
}

pub struct Harness {
    pub service: Arc<StandardServerLifecycleService>,
    pub runtime: Arc<FakeRuntime>,
    pub registry_store: InMemoryDocumentStore,
    pub config: ManagerConfig,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_registry(InMemoryDocumentStore::new()).await
    }

    pub async fn with_registry(registry_store: InMemoryDocumentStore) -> Self {
        let runtime = FakeRuntime::new();
        let config = ManagerConfig::default();

        let template_store = InMemoryDocumentStore::with_content(TEMPLATES);
        let templates = TemplateStore::load(&template_store).await;
        let registry = ServerRegistry::load(Arc::new(registry_store.clone())).await;
        let modpacks = ModpackResolver::new(
            Arc::new(CannedModpacks { status: 200 }),
            config.modpack.head_timeout(),
            config.modpack.max_archive_bytes,
        );

        let service = Arc::new(StandardServerLifecycleService::new(
            runtime.clone(),
            templates,
            registry,
            modpacks,
            &config,
        ));

        Self {
            service,
            runtime,
            registry_store,
            config,
        }
    }

    /// The registry document as last persisted.
    pub fn persisted(&self) -> RegistryDocument {
        self.registry_store
            .content()
            .map(|raw| serde_json::from_str(&raw).unwrap())
            .unwrap_or_default()
    }
}

pub fn template_document() -> TemplateDocument {
    serde_json::from_str(TEMPLATES).unwrap()
}
