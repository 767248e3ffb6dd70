// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Server Lifecycle
//!
//! [`StandardServerLifecycleService`] turns operator commands into container
//! runtime calls and keeps the server registry in step with what the runtime
//! reports.
//!
//! # Locking
//!
//! The registry sits behind one async mutex. It is held only for the short
//! read-check and write-persist steps of each operation, never across a
//! runtime call or a network fetch. `create` claims the name with a pending
//! reservation before releasing the lock, so two concurrent creates for the
//! same name cannot both succeed.
//!
//! # Failure policy
//!
//! Runtime errors are logged with the operation and target and returned to the
//! caller; nothing is retried. Registry writes that fail are logged and the
//! in-memory registry stays authoritative until the next successful write.

use std::collections::BTreeMap;
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::application::modpack::ModpackResolver;
use crate::application::registry::ServerRegistry;
use crate::application::server::{
    CreateServerRequest, CreatedServer, LogOutput, MemoryUsage, ServerDetails,
    ServerLifecycleService, ServerSummary, TemplateSummary,
};
use crate::application::templates::TemplateStore;
use crate::domain::config::{LogsConfig, ManagerConfig, RuntimeConfig};
use crate::domain::errors::ServerError;
use crate::domain::modpack::{ModpackInfo, ModpackMetadata};
use crate::domain::permissions::{Caller, PermissionGate, PolicyDecision};
use crate::domain::runtime::{ContainerId, ContainerSpec, GameRuntime, RuntimeError, VolumeBind};
use crate::domain::server::{ServerRecord, ServerStatus};
use crate::domain::template::{ServerTemplate, ENV_SERVER_TYPE};
use crate::domain::validation::{validate_port, validate_server_name};

const ENV_MODPACK: &str = "MODPACK";
const ENV_FORGE_VERSION: &str = "FORGE_VERSION";
const ENV_REMOVE_OLD_MODS: &str = "REMOVE_OLD_MODS";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy)]
enum PowerAction {
    Start,
    Stop,
    Restart,
}

impl PowerAction {
    fn operation(self) -> &'static str {
        match self {
            Self::Start => "starting server",
            Self::Stop => "stopping server",
            Self::Restart => "restarting server",
        }
    }

    fn resulting_status(self) -> ServerStatus {
        match self {
            Self::Start | Self::Restart => ServerStatus::Running,
            Self::Stop => ServerStatus::Stopped,
        }
    }
}

/// What a single runtime status query observed.
struct Observation {
    status: ServerStatus,
    raw: String,
}

pub struct StandardServerLifecycleService {
    runtime: Arc<dyn GameRuntime>,
    templates: TemplateStore,
    registry: Mutex<ServerRegistry>,
    modpacks: ModpackResolver,
    gate: PermissionGate,
    runtime_config: RuntimeConfig,
    logs_config: LogsConfig,
    inspect_archives: bool,
}

impl StandardServerLifecycleService {
    pub fn new(
        runtime: Arc<dyn GameRuntime>,
        templates: TemplateStore,
        registry: ServerRegistry,
        modpacks: ModpackResolver,
        config: &ManagerConfig,
    ) -> Self {
        Self {
            runtime,
            templates,
            registry: Mutex::new(registry),
            modpacks,
            gate: PermissionGate::new(config.permissions.allowed_roles.iter().cloned()),
            runtime_config: config.runtime.clone(),
            logs_config: config.logs.clone(),
            inspect_archives: config.modpack.inspect_archives,
        }
    }

    pub fn logs_config(&self) -> &LogsConfig {
        &self.logs_config
    }

    /// Snapshot of one registry record, for callers outside the command path.
    pub async fn record(&self, name: &str) -> Option<ServerRecord> {
        self.registry.lock().await.get(name).ok().cloned()
    }

    fn authorize(&self, caller: &Caller, operation: &str, decision: PolicyDecision) -> Result<(), ServerError> {
        match decision {
            PolicyDecision::Allow => Ok(()),
            PolicyDecision::Deny(reason) => {
                warn!(caller = %caller.id, operation, "Permission denied: {}", reason);
                Err(ServerError::permission_denied())
            }
        }
    }

    /// Permission check plus lookup for commands aimed at one server.
    async fn authorized_record(
        &self,
        caller: &Caller,
        operation: &str,
        name: &str,
    ) -> Result<ServerRecord, ServerError> {
        let record = self.registry.lock().await.get(name).ok().cloned();
        self.authorize(caller, operation, self.gate.check_manage(caller, record.as_ref()))?;
        record.ok_or_else(|| ServerError::not_found(format!("Server '{}' not found.", name)))
    }

    fn runtime_failure(&self, operation: &'static str, target: &str, err: RuntimeError) -> ServerError {
        error!(operation, target, "Container runtime call failed: {}", err);
        ServerError::runtime(operation, target, err)
    }

    fn container_of(record: &ServerRecord) -> Result<ContainerId, ServerError> {
        record.container().ok_or_else(|| {
            ServerError::not_found(format!(
                "Server '{}' has no container. Remove it and create it again.",
                record.name
            ))
        })
    }

    fn container_name(&self, name: &str) -> String {
        format!("{}{}", self.runtime_config.container_prefix, name)
    }

    fn container_spec(&self, name: &str, template: &ServerTemplate, port: Option<u16>, env: BTreeMap<String, String>) -> ContainerSpec {
        let mut ports = template.ports.clone();
        let (game_port, default_host) = template.game_port();
        ports.insert(game_port, port.or(default_host));

        let mut volumes = vec![VolumeBind {
            source: self.container_name(name),
            target: self.runtime_config.data_mount.clone(),
            mode: "rw".to_string(),
        }];
        volumes.extend(template.volumes.iter().map(|(source, volume)| VolumeBind {
            source: source.clone(),
            target: volume.bind.clone(),
            mode: volume.mode.clone(),
        }));

        ContainerSpec {
            image: template.image.clone(),
            name: self.container_name(name),
            env,
            ports,
            volumes,
            detach: true,
            restart_policy: template.restart_policy.clone(),
        }
    }

    /// Everything in `create` that happens outside the registry lock.
    async fn provision(
        &self,
        caller: &Caller,
        name: &str,
        template: &ServerTemplate,
        port: Option<u16>,
        modpack_url: Option<&str>,
    ) -> Result<(ServerRecord, Option<ModpackInfo>, Option<ModpackMetadata>), ServerError> {
        let (modpack, metadata) = match modpack_url {
            Some(url) => {
                let info = self.modpacks.validate_and_describe(url).await?;
                let metadata = if self.inspect_archives {
                    self.modpacks.inspect(url).await
                } else {
                    None
                };
                (Some(info), metadata)
            }
            None => (None, None),
        };

        let env = build_environment(template, modpack_url);
        let spec = self.container_spec(name, template, port, env);

        info!(server = name, template = %template.name, image = %spec.image, "Creating server container");
        let handle = self
            .runtime
            .create(&spec)
            .await
            .map_err(|e| self.runtime_failure("creating server", name, e))?;

        if let Err(e) = self.runtime.start(&handle.id).await {
            let err = self.runtime_failure("starting server", name, e);
            if let Err(cleanup) = self.runtime.remove(&handle.id).await {
                warn!(server = name, container = %handle.id, "Could not remove container after failed start: {}", cleanup);
            }
            return Err(err);
        }

        let status = match self.runtime.status(&handle.id).await {
            Ok(raw) if ServerStatus::from_runtime(&raw) == ServerStatus::Running => ServerStatus::Running,
            Ok(_) => ServerStatus::Created,
            Err(e) => {
                warn!(server = name, container = %handle.id, "Status check after start failed: {}", e);
                ServerStatus::Created
            }
        };

        let mut record = ServerRecord::new(name, template.name.clone(), ports_host(&spec, template), caller.id.clone());
        record.container_id = handle.id.as_str().to_string();
        record.status = status;
        record.modpack_url = modpack_url.map(str::to_string);

        Ok((record, modpack, metadata))
    }

    async fn observe(&self, record: &ServerRecord) -> Observation {
        let Some(id) = record.container() else {
            return Observation {
                status: ServerStatus::NotFound,
                raw: ServerStatus::NotFound.as_str().to_string(),
            };
        };

        match self.runtime.status(&id).await {
            Ok(raw) => Observation {
                status: ServerStatus::from_runtime(&raw),
                raw,
            },
            Err(e) if e.is_not_found() => Observation {
                status: ServerStatus::NotFound,
                raw: ServerStatus::NotFound.as_str().to_string(),
            },
            Err(e) => {
                warn!(server = %record.name, container = %id, "Status query failed: {}", e);
                Observation {
                    status: ServerStatus::Error,
                    raw: ServerStatus::Error.as_str().to_string(),
                }
            }
        }
    }

    async fn persist(registry: &ServerRegistry, operation: &str) {
        if let Err(e) = registry.persist().await {
            error!(operation, "Failed to save server registry: {}", e);
        }
    }

    async fn power(&self, caller: &Caller, name: &str, action: PowerAction) -> Result<(), ServerError> {
        let operation = action.operation();
        let record = self.authorized_record(caller, operation, name).await?;
        let id = Self::container_of(&record)?;

        let result = match action {
            PowerAction::Start => self.runtime.start(&id).await,
            PowerAction::Stop => self.runtime.stop(&id).await,
            PowerAction::Restart => self.runtime.restart(&id).await,
        };
        result.map_err(|e| self.runtime_failure(operation, name, e))?;

        let mut registry = self.registry.lock().await;
        match registry.reconcile_status(name, action.resulting_status()) {
            Ok(_) => Self::persist(&registry, operation).await,
            Err(_) => warn!(server = name, "Server was removed while {}", operation),
        }
        info!(server = name, caller = %caller.id, "Finished {}", operation);
        Ok(())
    }

    async fn delete_record(&self, name: &str) -> Result<ServerRecord, ServerError> {
        let mut registry = self.registry.lock().await;
        let record = registry
            .remove(name)
            .map_err(|_| ServerError::not_found(format!("Server '{}' not found.", name)))?;
        Self::persist(&registry, "removing server").await;
        Ok(record)
    }
}

/// Template environment plus the modpack variables the runtime image reads.
fn build_environment(template: &ServerTemplate, modpack_url: Option<&str>) -> BTreeMap<String, String> {
    let mut env = template.environment.clone();

    if let Some(url) = modpack_url {
        env.insert(ENV_MODPACK.to_string(), url.to_string());

        // Vanilla images cannot load mods
        let vanilla = env
            .get(ENV_SERVER_TYPE)
            .map_or(true, |t| t.eq_ignore_ascii_case("VANILLA"));
        if vanilla {
            env.insert(ENV_SERVER_TYPE.to_string(), "FORGE".to_string());
            env.entry(ENV_FORGE_VERSION.to_string())
                .or_insert_with(|| "RECOMMENDED".to_string());
        }
        env.insert(ENV_REMOVE_OLD_MODS.to_string(), "TRUE".to_string());
    }

    env
}

/// Host port bound to the template's game port in the final spec.
fn ports_host(spec: &ContainerSpec, template: &ServerTemplate) -> Option<u16> {
    let (game_port, _) = template.game_port();
    spec.ports.get(&game_port).copied().flatten()
}

fn to_megabytes(bytes: u64) -> f64 {
    ((bytes as f64 / BYTES_PER_MB) * 10.0).trunc() / 10.0
}

#[async_trait]
impl ServerLifecycleService for StandardServerLifecycleService {
    async fn list_templates(&self, caller: &Caller) -> Result<Vec<TemplateSummary>, ServerError> {
        self.authorize(caller, "listing templates", self.gate.check_role(caller))?;

        Ok(self
            .templates
            .list()
            .map(|t| TemplateSummary {
                name: t.name.clone(),
                description: t.description.clone(),
                server_type: t.server_type().map(str::to_string),
                memory: t.memory().map(str::to_string),
            })
            .collect())
    }

    async fn create_server(
        &self,
        caller: &Caller,
        request: CreateServerRequest,
    ) -> Result<CreatedServer, ServerError> {
        self.authorize(caller, "creating server", self.gate.check_role(caller))?;

        let name = request.name.as_str();
        if !validate_server_name(name) {
            return Err(ServerError::validation(
                "Invalid server name. Use 1-32 letters, digits, underscores or hyphens.",
            ));
        }

        let template = self
            .templates
            .get(&request.template)
            .map_err(|_| {
                ServerError::not_found(format!(
                    "Template '{}' not found. Use !list_templates to see available templates.",
                    request.template
                ))
            })?
            .clone();

        let port = match request.port {
            Some(port) if validate_port(port) => u16::try_from(port).ok(),
            Some(_) => return Err(ServerError::validation("Port must be between 1024 and 65535.")),
            None => None,
        };

        if !self.registry.lock().await.reserve(name) {
            return Err(ServerError::validation(format!("Server '{}' already exists.", name)));
        }

        let outcome = self
            .provision(caller, name, &template, port, request.modpack_url.as_deref())
            .await;

        let mut registry = self.registry.lock().await;
        registry.release(name);
        let (record, modpack, modpack_metadata) = outcome?;

        let created = CreatedServer {
            name: record.name.clone(),
            template_name: record.template_name.clone(),
            container_id: ContainerId::new(record.container_id.clone()),
            port: record.port,
            status: record.status,
            modpack,
            modpack_metadata,
        };
        registry.upsert(record);
        Self::persist(&registry, "creating server").await;

        info!(
            server = name,
            caller = %caller.id,
            container = %created.container_id,
            status = %created.status,
            "Server created"
        );
        Ok(created)
    }

    async fn start_server(&self, caller: &Caller, name: &str) -> Result<(), ServerError> {
        self.power(caller, name, PowerAction::Start).await
    }

    async fn stop_server(&self, caller: &Caller, name: &str) -> Result<(), ServerError> {
        self.power(caller, name, PowerAction::Stop).await
    }

    async fn restart_server(&self, caller: &Caller, name: &str) -> Result<(), ServerError> {
        self.power(caller, name, PowerAction::Restart).await
    }

    async fn remove_server(&self, caller: &Caller, name: &str) -> Result<ServerRecord, ServerError> {
        let operation = "removing server";
        let record = self.authorized_record(caller, operation, name).await?;

        let Some(id) = record.container() else {
            warn!(server = name, "Record has no container; deleting record only");
            return self.delete_record(name).await;
        };

        match self.runtime.stop(&id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                warn!(server = name, container = %id, "Container already gone; deleting record only");
                return self.delete_record(name).await;
            }
            Err(e) => return Err(self.runtime_failure("stopping server", name, e)),
        }

        match self.runtime.remove(&id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                warn!(server = name, container = %id, "Container vanished before removal");
            }
            // Stopped but still present: keep the record so the container is not orphaned
            Err(e) => return Err(self.runtime_failure(operation, name, e)),
        }

        let removed = self.delete_record(name).await?;
        info!(server = name, caller = %caller.id, "Server removed");
        Ok(removed)
    }

    async fn list_servers(&self, caller: &Caller) -> Result<Vec<ServerSummary>, ServerError> {
        self.authorize(caller, "listing servers", self.gate.check_role(caller))?;

        let snapshot: Vec<ServerRecord> = self.registry.lock().await.records().cloned().collect();

        let mut observed = Vec::with_capacity(snapshot.len());
        for record in &snapshot {
            observed.push((record.name.clone(), self.observe(record).await.status));
        }

        let mut registry = self.registry.lock().await;
        for (name, status) in &observed {
            if registry.reconcile_status(name, *status).is_err() {
                debug!(server = %name, "Removed during listing");
            }
        }
        Self::persist(&registry, "listing servers").await;

        Ok(registry
            .records()
            .map(|r| ServerSummary {
                name: r.name.clone(),
                template_name: r.template_name.clone(),
                status: r.status,
                port: r.port,
            })
            .collect())
    }

    async fn server_status(&self, caller: &Caller, name: &str) -> Result<ServerDetails, ServerError> {
        let record = self.authorized_record(caller, "checking server status", name).await?;
        let observation = self.observe(&record).await;

        {
            let mut registry = self.registry.lock().await;
            if let Ok(true) = registry.reconcile_status(name, observation.status) {
                Self::persist(&registry, "checking server status").await;
            }
        }

        let memory = match (observation.status, record.container()) {
            (ServerStatus::Running, Some(id)) => match self.runtime.stats(&id).await {
                Ok(stats) => Some(MemoryUsage {
                    usage_mb: to_megabytes(stats.memory_usage_bytes),
                    limit_mb: to_megabytes(stats.memory_limit_bytes),
                }),
                Err(e) => {
                    warn!(server = name, container = %id, "Could not read container stats: {}", e);
                    None
                }
            },
            _ => None,
        };

        Ok(ServerDetails {
            name: record.name.clone(),
            template_name: record.template_name.clone(),
            status: observation.status,
            runtime_status: observation.raw,
            port: record.port,
            created_by: record.created_by.clone(),
            created_at: record.created_at,
            short_id: record
                .container()
                .map(|id| id.short().to_string())
                .unwrap_or_default(),
            modpack_url: record.modpack_url.clone(),
            memory,
        })
    }

    async fn server_logs(
        &self,
        caller: &Caller,
        name: &str,
        lines: Option<i64>,
    ) -> Result<LogOutput, ServerError> {
        let operation = "fetching logs";
        let record = self.authorized_record(caller, operation, name).await?;

        let max = i64::from(self.logs_config.max_lines);
        let lines = lines.unwrap_or_else(|| i64::from(self.logs_config.default_lines));
        if lines > max {
            return Err(ServerError::validation(format!("Maximum {} lines allowed", max)));
        }
        let lines = u32::try_from(lines)
            .ok()
            .filter(|l| *l > 0)
            .ok_or_else(|| ServerError::validation("Number of lines must be at least 1"))?;

        let id = Self::container_of(&record)?;
        let text = self
            .runtime
            .logs(&id, lines)
            .await
            .map_err(|e| self.runtime_failure(operation, name, e))?;

        debug!(server = name, lines, bytes = text.len(), "Fetched server logs");
        Ok(LogOutput {
            name: name.to_string(),
            lines,
            text,
        })
    }
}
