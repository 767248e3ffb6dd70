// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Manager Configuration
//
// Defines the configuration schema for a Blockyard host, including:
// - Permission allow-list
// - Template and registry document locations
// - Container runtime connection and naming
// - Modpack fetch limits
// - Log delivery limits and pacing
//
// Every field has a default, so an empty or missing file is a valid config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::domain::permissions::DEFAULT_ALLOWED_ROLES;

pub const CONFIG_PATH_ENV: &str = "BLOCKYARD_CONFIG_PATH";

/// Largest log chunk the chat surface accepts in one message.
pub const MAX_CHUNK_CHARS: usize = 1900;
/// Shortest pause allowed between consecutive log chunks.
pub const MIN_CHUNK_DELAY_MS: u64 = 1000;
/// Upper bound on lines a single logs request may ask for.
pub const MAX_LOG_LINES: u32 = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub permissions: PermissionsConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub modpack: ModpackConfig,

    #[serde(default)]
    pub logs: LogsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionsConfig {
    #[serde(default = "default_allowed_roles")]
    pub allowed_roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_templates_file")]
    pub templates_file: PathBuf,

    #[serde(default = "default_servers_file")]
    pub servers_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// `unix:///var/run/docker.sock`, `tcp://host:2375`, or unset for local defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_host: Option<String>,

    /// Prefix for container and data-volume names
    #[serde(default = "default_container_prefix")]
    pub container_prefix: String,

    /// Where the persistent data volume is mounted inside the container
    #[serde(default = "default_data_mount")]
    pub data_mount: String,

    /// Grace period before the runtime kills a stopping container
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModpackConfig {
    #[serde(default = "default_head_timeout")]
    pub head_timeout_secs: u64,

    /// Download and scan archives at create time
    #[serde(default)]
    pub inspect_archives: bool,

    #[serde(default = "default_max_archive_bytes")]
    pub max_archive_bytes: u64,

    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_lines")]
    pub default_lines: u32,

    #[serde(default = "default_max_log_lines")]
    pub max_lines: u32,

    /// Downstream message-size limit
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,

    /// Downstream rate limit between consecutive chunks
    #[serde(default = "default_chunk_delay")]
    pub chunk_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self { allowed_roles: default_allowed_roles() }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            templates_file: default_templates_file(),
            servers_file: default_servers_file(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            docker_host: None,
            container_prefix: default_container_prefix(),
            data_mount: default_data_mount(),
            stop_timeout_secs: default_stop_timeout(),
        }
    }
}

impl Default for ModpackConfig {
    fn default() -> Self {
        Self {
            head_timeout_secs: default_head_timeout(),
            inspect_archives: false,
            max_archive_bytes: default_max_archive_bytes(),
            download_timeout_secs: default_download_timeout(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            default_lines: default_log_lines(),
            max_lines: default_max_log_lines(),
            chunk_chars: default_chunk_chars(),
            chunk_delay_ms: default_chunk_delay(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

impl ModpackConfig {
    pub fn head_timeout(&self) -> Duration {
        Duration::from_secs(self.head_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

impl LogsConfig {
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }
}

impl ManagerConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string. An empty document yields defaults.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. BLOCKYARD_CONFIG_PATH environment variable
    /// 2. ./blockyard-config.yaml (working directory)
    /// 3. ~/.blockyard/config.yaml (user home)
    /// 4. /etc/blockyard/config.yaml (Unix only)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./blockyard-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".blockyard").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/blockyard/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Same as [`Self::apply_env_overrides`] with an explicit lookup, so tests
    /// do not have to mutate the process environment.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(roles) = lookup("ALLOWED_ROLES") {
            let roles: Vec<String> = roles
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect();
            if roles.is_empty() {
                tracing::warn!("ALLOWED_ROLES is set but lists no roles. Ignoring.");
            } else {
                tracing::info!("Environment override: ALLOWED_ROLES={}", roles.join(","));
                self.permissions.allowed_roles = roles;
            }
        }

        if let Some(path) = lookup("TEMPLATES_FILE") {
            tracing::info!("Environment override: TEMPLATES_FILE={}", path);
            self.storage.templates_file = PathBuf::from(path);
        }

        if let Some(path) = lookup("SERVERS_FILE") {
            tracing::info!("Environment override: SERVERS_FILE={}", path);
            self.storage.servers_file = PathBuf::from(path);
        }

        if let Some(host) = lookup("DOCKER_HOST") {
            tracing::info!("Environment override: DOCKER_HOST={}", host);
            self.runtime.docker_host = Some(host);
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.permissions.allowed_roles.is_empty() {
            anyhow::bail!("permissions.allowed_roles cannot be empty");
        }

        if self.storage.templates_file.as_os_str().is_empty() {
            anyhow::bail!("storage.templates_file cannot be empty");
        }

        if self.storage.servers_file.as_os_str().is_empty() {
            anyhow::bail!("storage.servers_file cannot be empty");
        }

        if self.runtime.container_prefix.is_empty() {
            anyhow::bail!("runtime.container_prefix cannot be empty");
        }

        if !self.runtime.data_mount.starts_with('/') {
            anyhow::bail!(
                "runtime.data_mount must be an absolute path, got '{}'",
                self.runtime.data_mount
            );
        }

        if self.modpack.head_timeout_secs == 0 {
            anyhow::bail!("modpack.head_timeout_secs must be greater than zero");
        }

        if self.logs.chunk_chars == 0 || self.logs.chunk_chars > MAX_CHUNK_CHARS {
            anyhow::bail!(
                "logs.chunk_chars must be between 1 and {}, got {}",
                MAX_CHUNK_CHARS,
                self.logs.chunk_chars
            );
        }

        if self.logs.chunk_delay_ms < MIN_CHUNK_DELAY_MS {
            anyhow::bail!(
                "logs.chunk_delay_ms must be at least {}, got {}",
                MIN_CHUNK_DELAY_MS,
                self.logs.chunk_delay_ms
            );
        }

        if self.logs.max_lines == 0 || self.logs.max_lines > MAX_LOG_LINES {
            anyhow::bail!(
                "logs.max_lines must be between 1 and {}, got {}",
                MAX_LOG_LINES,
                self.logs.max_lines
            );
        }

        if self.logs.default_lines > self.logs.max_lines {
            anyhow::bail!(
                "logs.default_lines ({}) exceeds logs.max_lines ({})",
                self.logs.default_lines,
                self.logs.max_lines
            );
        }

        Ok(())
    }
}

fn default_allowed_roles() -> Vec<String> {
    DEFAULT_ALLOWED_ROLES.iter().map(|r| r.to_string()).collect()
}

fn default_templates_file() -> PathBuf {
    PathBuf::from("config/templates.json")
}

fn default_servers_file() -> PathBuf {
    PathBuf::from("data/active_servers.json")
}

fn default_container_prefix() -> String {
    "minecraft_".to_string()
}

fn default_data_mount() -> String {
    "/data".to_string()
}

fn default_stop_timeout() -> u64 {
    10
}

fn default_head_timeout() -> u64 {
    10
}

fn default_max_archive_bytes() -> u64 {
    512 * 1024 * 1024
}

fn default_download_timeout() -> u64 {
    120
}

fn default_log_lines() -> u32 {
    50
}

fn default_max_log_lines() -> u32 {
    MAX_LOG_LINES
}

fn default_chunk_chars() -> usize {
    MAX_CHUNK_CHARS
}

fn default_chunk_delay() -> u64 {
    MIN_CHUNK_DELAY_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.permissions.allowed_roles, vec!["Admin", "Moderator", "ServerManager"]);
        assert_eq!(config.storage.servers_file, PathBuf::from("data/active_servers.json"));
        assert_eq!(config.modpack.head_timeout(), Duration::from_secs(10));
        assert_eq!(config.logs.chunk_chars, 1900);
        assert_eq!(config.logs.chunk_delay(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config = ManagerConfig::from_yaml_str(
            "permissions:\n  allowed_roles: [Ops]\nlogs:\n  max_lines: 80\n",
        )
        .unwrap();
        assert_eq!(config.permissions.allowed_roles, vec!["Ops"]);
        assert_eq!(config.logs.max_lines, 80);
        assert_eq!(config.logs.default_lines, 50);
        assert_eq!(config.runtime.container_prefix, "minecraft_");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = ManagerConfig::from_yaml_str("  \n").unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = ManagerConfig::default();
        config.runtime.docker_host = Some("unix:///run/docker.sock".to_string());
        config.modpack.inspect_archives = true;

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = ManagerConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.runtime.docker_host.as_deref(), Some("unix:///run/docker.sock"));
        assert!(parsed.modpack.inspect_archives);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ALLOWED_ROLES", "Admin, Helper ,"),
            ("SERVERS_FILE", "/var/lib/blockyard/servers.json"),
            ("LOG_LEVEL", "DEBUG"),
        ]);
        let mut config = ManagerConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.permissions.allowed_roles, vec!["Admin", "Helper"]);
        assert_eq!(
            config.storage.servers_file,
            PathBuf::from("/var/lib/blockyard/servers.json")
        );
        assert_eq!(config.storage.templates_file, PathBuf::from("config/templates.json"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validation() {
        let mut config = ManagerConfig::default();

        config.permissions.allowed_roles.clear();
        assert!(config.validate().is_err());
        config.permissions.allowed_roles = vec!["Admin".to_string()];

        config.logs.default_lines = 150;
        assert!(config.validate().is_err());
        config.logs.default_lines = 50;

        config.logs.chunk_chars = 0;
        assert!(config.validate().is_err());
        config.logs.chunk_chars = 1900;

        config.runtime.data_mount = "data".to_string();
        assert!(config.validate().is_err());
        config.runtime.data_mount = "/data".to_string();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_delivery_limits_cannot_be_loosened() {
        let config = ManagerConfig::from_yaml_str("logs:\n  chunk_chars: 4000\n").unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("logs.chunk_chars"), "{err}");

        let config = ManagerConfig::from_yaml_str("logs:\n  chunk_delay_ms: 250\n").unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("logs.chunk_delay_ms"), "{err}");

        let config = ManagerConfig::from_yaml_str("logs:\n  max_lines: 500\n").unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("logs.max_lines"), "{err}");

        // Tighter than the defaults is fine
        let config = ManagerConfig::from_yaml_str(
            "logs:\n  chunk_chars: 1000\n  chunk_delay_ms: 2000\n  max_lines: 60\n  default_lines: 20\n",
        )
        .unwrap();
        assert!(config.validate().is_ok());
    }
}
