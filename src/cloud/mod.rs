//! Inventory Provider Contract
//!
//! Infrastructure providers enumerate machine instances and describe them:
//! - Instance listing by name pattern
//! - Address, external ID and capacity lookups
//!
//! Instance queries are an optional capability; a provider that cannot
//! answer them returns `None` from [`CloudProvider::instances`].

mod configured;

pub use configured::{ConfiguredInventory, InstanceSpec};

use crate::error::CloudError;
use crate::types::ResourceList;
use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;

pub trait CloudProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Instance-query capability, if the provider has one.
    fn instances(&self) -> Option<Arc<dyn Instances>>;
}

#[async_trait]
pub trait Instances: Send + Sync {
    /// Names of all instances matching `pattern`
    async fn list(&self, pattern: &str) -> Result<Vec<String>, CloudError>;

    /// Reachable address of an instance
    async fn ip_address(&self, name: &str) -> Result<IpAddr, CloudError>;

    /// Provider-side identifier of an instance
    async fn instance_id(&self, name: &str) -> Result<String, CloudError>;

    /// Capacity of an instance; `None` when the provider does not know it
    async fn resources(&self, name: &str) -> Result<Option<ResourceList>, CloudError>;
}
