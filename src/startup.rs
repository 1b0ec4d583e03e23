//! Builds the controller and its collaborators from a [`Config`].

use crate::cloud::{CloudProvider, ConfiguredInventory};
use crate::config::{Config, ProviderKind};
use crate::controller::{Inventory, NodeController, StaticHostsResolver, SystemResolver};
use crate::error::NodeError;
use crate::health::{HealthChecker, HttpHealthChecker};
use crate::store::{ClusterStore, HttpStore, MemoryStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub fn cloud_provider(config: &Config) -> Option<Arc<dyn CloudProvider>> {
    match config.cloud.provider {
        ProviderKind::None => None,
        ProviderKind::Configured => Some(Arc::new(ConfiguredInventory::new(config.cloud.instances.clone()))),
    }
}

pub fn store(config: &Config) -> Result<Arc<dyn ClusterStore>, NodeError> {
    match &config.store.api_server {
        Some(url) => {
            info!("Using API server store at {}", url);
            let store = HttpStore::new(url.clone(), Duration::from_secs(config.store.timeout_secs))?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("No api_server configured, node records are kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub fn health_checker(config: &Config) -> Result<Arc<dyn HealthChecker>, NodeError> {
    let checker = HttpHealthChecker::new(
        config.health.scheme.clone(),
        config.health.port,
        config.health.path.clone(),
        Duration::from_secs(config.health.timeout_secs),
    )
    .map_err(|e| NodeError::config(format!("Failed to build health checker: {}", e)))?;
    Ok(Arc::new(checker))
}

/// Wires a controller against the configured store, provider and health
/// transport.
pub fn build_controller(config: &Config) -> Result<NodeController, NodeError> {
    config.validate()?;
    build_controller_with(config, store(config)?, health_checker(config)?)
}

/// Like [`build_controller`], with the store and health transport supplied.
pub fn build_controller_with(
    config: &Config,
    store: Arc<dyn ClusterStore>,
    checker: Arc<dyn HealthChecker>,
) -> Result<NodeController, NodeError> {
    let cloud = cloud_provider(config);
    if let Some(provider) = &cloud {
        info!(
            "Using {} inventory provider with pattern {:?}",
            provider.name(),
            config.cloud.match_pattern
        );
    }
    let inventory = Inventory::new(
        cloud,
        config.cloud.match_pattern.clone(),
        config.static_nodes.clone(),
        config.static_capacity.clone(),
    );
    let resolver = StaticHostsResolver::new(config.hosts.clone()).with_fallback(Arc::new(SystemResolver));

    Ok(NodeController::new(
        inventory,
        store,
        checker,
        Arc::new(resolver),
        config.controller.settings(),
    ))
}
