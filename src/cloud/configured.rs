use super::{CloudProvider, Instances};
use crate::error::CloudError;
use crate::types::ResourceList;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

/// One machine as declared in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceSpec {
    pub name: String,
    #[serde(default)]
    pub ip: Option<IpAddr>,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub capacity: Option<ResourceList>,
}

/// Inventory provider whose instance table is fixed at construction.
#[derive(Debug, Clone)]
pub struct ConfiguredInventory {
    instances: Arc<InstanceTable>,
}

/// Keyed by lowercased name, matching how node records are stored.
#[derive(Debug)]
struct InstanceTable {
    /// Declaration order, used for listing
    order: Vec<String>,
    by_name: HashMap<String, InstanceSpec>,
}

impl ConfiguredInventory {
    pub fn new(specs: Vec<InstanceSpec>) -> Self {
        let mut order = Vec::with_capacity(specs.len());
        let mut by_name = HashMap::with_capacity(specs.len());
        for spec in specs {
            let key = spec.name.to_lowercase();
            if !by_name.contains_key(&key) {
                order.push(key.clone());
            }
            by_name.insert(key, spec);
        }
        Self {
            instances: Arc::new(InstanceTable { order, by_name }),
        }
    }

    fn lookup(&self, name: &str) -> Result<&InstanceSpec, CloudError> {
        self.instances
            .by_name
            .get(&name.to_lowercase())
            .ok_or_else(|| CloudError::NotFound(name.to_string()))
    }
}

impl CloudProvider for ConfiguredInventory {
    fn name(&self) -> &str {
        "configured"
    }

    fn instances(&self) -> Option<Arc<dyn Instances>> {
        Some(Arc::new(self.clone()))
    }
}

#[async_trait]
impl Instances for ConfiguredInventory {
    async fn list(&self, pattern: &str) -> Result<Vec<String>, CloudError> {
        let re = Regex::new(pattern).map_err(|e| CloudError::InvalidPattern(e.to_string()))?;
        Ok(self
            .instances
            .order
            .iter()
            .filter(|name| re.is_match(name))
            .cloned()
            .collect())
    }

    async fn ip_address(&self, name: &str) -> Result<IpAddr, CloudError> {
        self.lookup(name)?
            .ip
            .ok_or_else(|| CloudError::Backend(format!("no address recorded for {}", name)))
    }

    async fn instance_id(&self, name: &str) -> Result<String, CloudError> {
        self.lookup(name)?
            .instance_id
            .clone()
            .ok_or_else(|| CloudError::Backend(format!("no instance id recorded for {}", name)))
    }

    async fn resources(&self, name: &str) -> Result<Option<ResourceList>, CloudError> {
        Ok(self.lookup(name)?.capacity.clone())
    }
}
