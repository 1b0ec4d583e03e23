//! Configuration Management
//!
//! Provides functionality for:
//! - Loading/saving the YAML configuration
//! - Configuration validation
//! - Default configuration

use crate::cloud::InstanceSpec;
use crate::controller::ControllerSettings;
use crate::error::NodeError;
use crate::types::ResourceList;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControllerConfig {
    /// Reconciliation period in seconds
    #[serde(default = "default_period")]
    pub period_secs: u64,
    /// Diff the store against the inventory provider
    #[serde(default = "default_true")]
    pub sync_node_list: bool,
    /// Registration passes at startup
    #[serde(default = "default_register_retry_count")]
    pub register_retry_count: u32,
    /// Seconds between registration passes, the period when unset
    #[serde(default)]
    pub register_retry_interval_secs: Option<u64>,
    /// Seconds a node may stay not-ready before its workloads are evicted
    #[serde(default = "default_pod_eviction_timeout")]
    pub pod_eviction_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    None,
    /// Instances declared in this file
    Configured,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CloudConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    /// Instance name regex; empty disables inventory mode
    #[serde(default)]
    pub match_pattern: String,
    #[serde(default)]
    pub instances: Vec<InstanceSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthConfig {
    #[serde(default = "default_health_scheme")]
    pub scheme: String,
    #[serde(default = "default_health_port")]
    pub port: u16,
    #[serde(default = "default_health_path")]
    pub path: String,
    /// Per-probe timeout in seconds
    #[serde(default = "default_health_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Base URL of the API server; in-memory store when unset
    #[serde(default)]
    pub api_server: Option<String>,
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for rolling log files; console only when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Write JSON lines to the log files
    #[serde(default = "default_true")]
    pub json_file: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub cloud: CloudConfig,
    /// Node names used when not running against an inventory provider
    #[serde(default)]
    pub static_nodes: Vec<String>,
    /// Capacity given to static nodes and to instances without one
    #[serde(default)]
    pub static_capacity: ResourceList,
    /// Host table consulted before DNS in static mode
    #[serde(default)]
    pub hosts: HashMap<String, Vec<IpAddr>>,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default implementations
impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            period_secs: default_period(),
            sync_node_list: default_true(),
            register_retry_count: default_register_retry_count(),
            register_retry_interval_secs: None,
            pod_eviction_timeout_secs: default_pod_eviction_timeout(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            scheme: default_health_scheme(),
            port: default_health_port(),
            path: default_health_path(),
            timeout_secs: default_health_timeout(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_server: None,
            timeout_secs: default_store_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
            json_file: default_true(),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_period() -> u64 {
    10
}

fn default_register_retry_count() -> u32 {
    10
}

fn default_pod_eviction_timeout() -> u64 {
    300
}

fn default_health_scheme() -> String {
    "http".to_string()
}

fn default_health_port() -> u16 {
    10248
}

fn default_health_path() -> String {
    "/healthz".to_string()
}

fn default_health_timeout() -> u64 {
    5
}

fn default_store_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ControllerConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    pub fn settings(&self) -> ControllerSettings {
        ControllerSettings {
            register_retry_count: self.register_retry_count,
            register_retry_interval: self.register_retry_interval_secs.map(Duration::from_secs),
            pod_eviction_timeout: Duration::from_secs(self.pod_eviction_timeout_secs),
        }
    }
}

impl Config {
    /// Load configuration from file, writing a default one if it is missing
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        if !path.exists() {
            debug!("Configuration file not found at {:?}, creating default", path);
            let config = Config::default();
            config.save(path)?;
            return Ok(config);
        }
        Self::load_from_file(path)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, NodeError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| NodeError::config(format!("Failed to read config file {}: {}", path.display(), e)))?;
        let config: Config = serde_yaml::from_str(&contents)
            .map_err(|e| NodeError::config(format!("Failed to parse config file {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Try the usual locations in order, falling back to defaults
    pub fn load_default() -> Result<Self, NodeError> {
        for path in Self::search_paths() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }
        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("nodeward.yml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("nodeward").join("config.yml"));
        }
        paths.push(PathBuf::from("/etc/nodeward/config.yml"));
        paths
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), NodeError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| NodeError::config(format!("Failed to create config directory: {}", e)))?;
        }
        let contents = serde_yaml::to_string(self)?;

        // Write atomically using a temporary file
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, contents)
            .map_err(|e| NodeError::config(format!("Failed to write config: {}", e)))?;
        fs::rename(&temp_path, path)
            .map_err(|e| NodeError::config(format!("Failed to save config: {}", e)))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        if self.controller.period_secs == 0 {
            return Err(NodeError::config("controller.period_secs must be positive"));
        }
        if self.controller.register_retry_count == 0 {
            return Err(NodeError::config("controller.register_retry_count must be positive"));
        }
        if !self.cloud.match_pattern.is_empty() {
            Regex::new(&self.cloud.match_pattern)
                .map_err(|e| NodeError::config(format!("cloud.match_pattern is not a valid regex: {}", e)))?;
        }
        if self.cloud.provider == ProviderKind::None && !self.cloud.instances.is_empty() {
            return Err(NodeError::config("cloud.instances requires cloud.provider: configured"));
        }
        Ok(())
    }
}
