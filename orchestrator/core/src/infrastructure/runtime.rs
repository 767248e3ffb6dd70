// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::runtime::{
    ContainerHandle, ContainerId, ContainerSpec, ContainerStats, GameRuntime, RuntimeError,
};
use crate::domain::template::RestartPolicySpec;
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, LogsOptions, RemoveContainerOptions,
    RestartContainerOptions, StartContainerOptions, StatsOptions, StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::models::{HostConfig, PortBinding, RestartPolicy, RestartPolicyNameEnum};
use bollard::Docker;
use futures::StreamExt;
use std::collections::HashMap;
use tracing::{debug, info};

/// Seconds bollard waits on the daemon before giving up on a request.
const DOCKER_TIMEOUT_SECS: u64 = 120;

pub struct DockerRuntime {
    docker: Docker,
    stop_timeout_secs: i64,
}

impl DockerRuntime {
    /// Connect to the Docker daemon.
    ///
    /// `host` accepts `unix:///path/to/docker.sock`, `tcp://host:port` or
    /// `http://host:port`; `None` auto-detects (honouring `DOCKER_HOST`).
    pub fn new(host: Option<&str>, stop_timeout_secs: u64) -> Result<Self, RuntimeError> {
        let docker = match host {
            Some(host) => Self::connect(host)?,
            None => Docker::connect_with_local_defaults().map_err(|e| {
                RuntimeError::ConnectionFailed(format!(
                    "Failed to connect to Docker: {}\n\n\
                     Common causes:\n\
                     - Docker daemon not running (check: docker ps)\n\
                     - Permission denied accessing Docker socket\n\
                     - Current user not in 'docker' group",
                    e
                ))
            })?,
        };

        Ok(Self {
            docker,
            stop_timeout_secs: i64::try_from(stop_timeout_secs).unwrap_or(i64::MAX),
        })
    }

    fn connect(host: &str) -> Result<Docker, RuntimeError> {
        let result = if let Some(path) = host.strip_prefix("unix://") {
            #[cfg(unix)]
            {
                Docker::connect_with_unix(path, DOCKER_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
            }
            #[cfg(not(unix))]
            {
                let _ = path;
                return Err(RuntimeError::ConnectionFailed(format!(
                    "Unix sockets are not supported on this platform: {}",
                    host
                )));
            }
        } else if let Some(addr) = host.strip_prefix("tcp://") {
            Docker::connect_with_http(
                &format!("http://{}", addr),
                DOCKER_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            )
        } else {
            Docker::connect_with_http(host, DOCKER_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
        };

        result.map_err(|e| {
            RuntimeError::ConnectionFailed(format!(
                "Failed to connect to Docker at {}: {}\n\n\
                 Ensure Docker is running and the host address is correct.",
                host, e
            ))
        })
    }

    /// Verify Docker daemon is accessible
    pub async fn healthcheck(&self) -> Result<(), RuntimeError> {
        self.docker.ping().await.map_err(|e| {
            RuntimeError::ConnectionFailed(format!(
                "Cannot connect to Docker daemon: {}\n\n\
                 Docker healthcheck failed. Verify with: docker ps",
                e
            ))
        })?;
        Ok(())
    }
}

/// 404 becomes `InstanceNotFound`; everything else keeps the daemon's message.
fn map_docker_error(id: &ContainerId, err: DockerError) -> RuntimeError {
    match err {
        DockerError::DockerResponseServerError { status_code: 404, message } => {
            RuntimeError::InstanceNotFound(format!("{}: {}", id.short(), message))
        }
        other => RuntimeError::OperationFailed(other.to_string()),
    }
}

/// Docker answers 304 when a container is already in the requested state.
fn is_not_modified(err: &DockerError) -> bool {
    matches!(err, DockerError::DockerResponseServerError { status_code: 304, .. })
}

fn restart_policy(spec: &RestartPolicySpec) -> RestartPolicy {
    let name = match spec.name.as_str() {
        "always" => RestartPolicyNameEnum::ALWAYS,
        "unless-stopped" => RestartPolicyNameEnum::UNLESS_STOPPED,
        "on-failure" => RestartPolicyNameEnum::ON_FAILURE,
        "no" | "" => RestartPolicyNameEnum::NO,
        other => {
            debug!("Unknown restart policy '{}', using 'no'", other);
            RestartPolicyNameEnum::NO
        }
    };

    RestartPolicy {
        name: Some(name),
        maximum_retry_count: spec.maximum_retry_count,
    }
}

fn container_config(spec: &ContainerSpec) -> Config<String> {
    let env: Vec<String> = spec.env.iter().map(|(k, v)| format!("{}={}", k, v)).collect();

    let mut exposed_ports = HashMap::new();
    let mut port_bindings = HashMap::new();
    for (container_port, host_port) in &spec.ports {
        exposed_ports.insert(container_port.clone(), HashMap::new());
        // An empty host port asks the daemon to pick a free one
        port_bindings.insert(
            container_port.clone(),
            Some(vec![PortBinding {
                host_ip: None,
                host_port: host_port.map(|p| p.to_string()),
            }]),
        );
    }

    let binds: Vec<String> = spec.volumes.iter().map(|v| v.to_bind_string()).collect();

    let host_config = HostConfig {
        binds: Some(binds),
        port_bindings: Some(port_bindings),
        restart_policy: Some(restart_policy(&spec.restart_policy)),
        ..Default::default()
    };

    Config {
        image: Some(spec.image.clone()),
        env: Some(env),
        exposed_ports: Some(exposed_ports),
        attach_stdin: Some(false),
        attach_stdout: Some(!spec.detach),
        attach_stderr: Some(!spec.detach),
        tty: Some(false),
        host_config: Some(host_config),
        ..Default::default()
    }
}

#[async_trait]
impl GameRuntime for DockerRuntime {
    async fn create(&self, spec: &ContainerSpec) -> Result<ContainerHandle, RuntimeError> {
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let res = self
            .docker
            .create_container(Some(options), container_config(spec))
            .await
            .map_err(|e| RuntimeError::SpawnFailed(e.to_string()))?;

        for warning in &res.warnings {
            debug!("Docker warning creating {}: {}", spec.name, warning);
        }

        info!("Created container {} ({})", spec.name, res.id);
        Ok(ContainerHandle {
            id: ContainerId::new(res.id),
            name: spec.name.clone(),
            status: "created".to_string(),
        })
    }

    async fn start(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        match self
            .docker
            .start_container(id.as_str(), None::<StartContainerOptions<String>>)
            .await
        {
            Ok(()) => {}
            Err(e) if is_not_modified(&e) => debug!("Container {} already running", id.short()),
            Err(e) => return Err(map_docker_error(id, e)),
        }
        info!("Started container {}", id.short());
        Ok(())
    }

    async fn stop(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        let options = StopContainerOptions { t: self.stop_timeout_secs };
        match self.docker.stop_container(id.as_str(), Some(options)).await {
            Ok(()) => {}
            Err(e) if is_not_modified(&e) => debug!("Container {} already stopped", id.short()),
            Err(e) => return Err(map_docker_error(id, e)),
        }
        info!("Stopped container {}", id.short());
        Ok(())
    }

    async fn restart(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        let options = RestartContainerOptions {
            t: isize::try_from(self.stop_timeout_secs).unwrap_or(isize::MAX),
        };
        self.docker
            .restart_container(id.as_str(), Some(options))
            .await
            .map_err(|e| map_docker_error(id, e))?;
        info!("Restarted container {}", id.short());
        Ok(())
    }

    async fn remove(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        // Named data volumes survive; only the container goes
        let options = RemoveContainerOptions {
            force: false,
            v: false,
            ..Default::default()
        };
        self.docker
            .remove_container(id.as_str(), Some(options))
            .await
            .map_err(|e| map_docker_error(id, e))?;
        info!("Removed container {}", id.short());
        Ok(())
    }

    async fn get(&self, id: &ContainerId) -> Result<ContainerHandle, RuntimeError> {
        let inspect = self
            .docker
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_docker_error(id, e))?;

        let status = inspect
            .state
            .and_then(|s| s.status)
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(ContainerHandle {
            id: ContainerId::new(inspect.id.unwrap_or_else(|| id.as_str().to_string())),
            name: inspect
                .name
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_default(),
            status,
        })
    }

    async fn logs(&self, id: &ContainerId, tail: u32) -> Result<String, RuntimeError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: tail.to_string(),
            ..Default::default()
        };

        let mut stream = self.docker.logs(id.as_str(), Some(options));
        let mut output = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_docker_error(id, e))?;
            output.push_str(&String::from_utf8_lossy(&chunk.into_bytes()));
        }
        Ok(output)
    }

    async fn stats(&self, id: &ContainerId) -> Result<ContainerStats, RuntimeError> {
        let options = StatsOptions {
            stream: false,
            one_shot: true,
        };

        let mut stream = self.docker.stats(id.as_str(), Some(options));
        let stats = match stream.next().await {
            Some(result) => result.map_err(|e| map_docker_error(id, e))?,
            None => {
                return Err(RuntimeError::OperationFailed(format!(
                    "No stats reported for container {}",
                    id.short()
                )))
            }
        };

        Ok(ContainerStats {
            memory_usage_bytes: stats.memory_stats.usage.unwrap_or(0),
            memory_limit_bytes: stats.memory_stats.limit.unwrap_or(0),
        })
    }
}
