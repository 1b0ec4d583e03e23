//! Builds node records from the inventory provider or the static list.

use crate::cloud::{CloudProvider, Instances};
use crate::error::NodeError;
use crate::types::{Node, ResourceList};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct Inventory {
    cloud: Option<Arc<dyn CloudProvider>>,
    match_pattern: String,
    static_nodes: Vec<String>,
    static_capacity: ResourceList,
}

impl Inventory {
    pub fn new(
        cloud: Option<Arc<dyn CloudProvider>>,
        match_pattern: impl Into<String>,
        static_nodes: Vec<String>,
        static_capacity: ResourceList,
    ) -> Self {
        Self {
            cloud,
            match_pattern: match_pattern.into(),
            static_nodes,
            static_capacity,
        }
    }

    /// Inventory mode needs both a provider and a non-empty pattern.
    pub fn is_running_cloud_provider(&self) -> bool {
        self.cloud.is_some() && !self.match_pattern.is_empty()
    }

    pub fn instances(&self) -> Result<Arc<dyn Instances>, NodeError> {
        self.cloud
            .as_ref()
            .and_then(|cloud| cloud.instances())
            .ok_or(NodeError::ProviderUnsupported)
    }

    /// Nodes for every instance matching the pattern. Fails only when the
    /// instance list itself cannot be obtained.
    pub async fn cloud_nodes(&self) -> Result<Vec<Node>, NodeError> {
        let instances = self.instances()?;
        let matches = instances
            .list(&self.match_pattern)
            .await
            .map_err(NodeError::Enumeration)?;

        let mut nodes = Vec::with_capacity(matches.len());
        for name in matches {
            let capacity = match instances.resources(&name).await {
                Ok(Some(resources)) => resources,
                Ok(None) => self.static_capacity.clone(),
                Err(e) => {
                    warn!("error getting resources for instance {}: {}", name, e);
                    ResourceList::new()
                }
            };
            nodes.push(Node::new(name).with_capacity(capacity));
        }
        Ok(nodes)
    }

    pub fn static_nodes(&self) -> Vec<Node> {
        self.static_nodes
            .iter()
            .map(|name| Node::new(name.clone()).with_capacity(self.static_capacity.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{ConfiguredInventory, InstanceSpec};

    struct NoInstances;

    impl CloudProvider for NoInstances {
        fn name(&self) -> &str {
            "bare"
        }

        fn instances(&self) -> Option<Arc<dyn Instances>> {
            None
        }
    }

    fn fallback() -> ResourceList {
        [("cpu".to_string(), "1".to_string())].into()
    }

    fn provider() -> Arc<dyn CloudProvider> {
        Arc::new(ConfiguredInventory::new(vec![
            InstanceSpec {
                name: "big".to_string(),
                ip: None,
                instance_id: None,
                capacity: Some([("cpu".to_string(), "64".to_string())].into()),
            },
            InstanceSpec {
                name: "plain".to_string(),
                ip: None,
                instance_id: None,
                capacity: None,
            },
        ]))
    }

    #[test]
    fn test_inventory_mode_requires_pattern() {
        assert!(!Inventory::new(Some(provider()), "", vec![], fallback()).is_running_cloud_provider());
        assert!(!Inventory::new(None, ".*", vec![], fallback()).is_running_cloud_provider());
        assert!(Inventory::new(Some(provider()), ".*", vec![], fallback()).is_running_cloud_provider());
    }

    #[tokio::test]
    async fn test_cloud_nodes_fall_back_to_static_capacity() {
        let inventory = Inventory::new(Some(provider()), ".*", vec![], fallback());
        let nodes = inventory.cloud_nodes().await.unwrap();

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].capacity["cpu"], "64");
        assert_eq!(nodes[1].capacity, fallback());
    }

    #[tokio::test]
    async fn test_missing_capability_is_an_error() {
        let inventory = Inventory::new(Some(Arc::new(NoInstances)), ".*", vec![], fallback());
        let err = inventory.cloud_nodes().await.unwrap_err();
        assert!(matches!(err, NodeError::ProviderUnsupported));
        assert_eq!(err.to_string(), "provider does not support instance queries");
    }

    #[tokio::test]
    async fn test_bad_pattern_aborts_enumeration() {
        let inventory = Inventory::new(Some(provider()), "(", vec![], fallback());
        assert!(matches!(
            inventory.cloud_nodes().await,
            Err(NodeError::Enumeration(_))
        ));
    }

    #[test]
    fn test_static_nodes_share_capacity() {
        let inventory = Inventory::new(None, "", vec!["a".into(), "b".into()], fallback());
        let nodes = inventory.static_nodes();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.capacity == fallback()));
    }
}
