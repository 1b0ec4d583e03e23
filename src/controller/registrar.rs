//! Idempotent, retrying node registration.

use crate::error::NodeError;
use crate::store::ClusterStore;
use crate::types::{canonicalize_names, Node};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Clone)]
pub struct Registrar {
    store: Arc<dyn ClusterStore>,
}

impl Registrar {
    pub fn new(store: Arc<dyn ClusterStore>) -> Self {
        Self { store }
    }

    /// Creates every node in the store, making up to `retry_limit` passes
    /// over the list and waiting `retry_interval` between passes.
    ///
    /// Names are lowercased first. A node that already exists counts as
    /// registered.
    pub async fn register(
        &self,
        nodes: Vec<Node>,
        retry_limit: u32,
        retry_interval: Duration,
    ) -> Result<(), NodeError> {
        let nodes = canonicalize_names(nodes);
        if nodes.is_empty() {
            return Ok(());
        }

        let mut registered: HashSet<String> = HashSet::with_capacity(nodes.len());
        for pass in 1..=retry_limit {
            for node in &nodes {
                if registered.contains(&node.name) {
                    continue;
                }
                match self.store.create_node(node).await {
                    Ok(_) => {
                        info!("Registered node in registry: {}", node.name);
                        registered.insert(node.name.clone());
                    }
                    Err(e) if e.is_already_exists() => {
                        info!("Node {} already registered", node.name);
                        registered.insert(node.name.clone());
                    }
                    Err(e) => error!("Error registering node {}, retrying: {}", node.name, e),
                }
                if registered.len() == nodes.len() {
                    info!("Successfully registered all nodes");
                    return Ok(());
                }
            }
            if pass < retry_limit {
                tokio::time::sleep(retry_interval).await;
            }
        }

        let pending = nodes
            .into_iter()
            .filter(|n| !registered.contains(&n.name))
            .map(|n| n.name)
            .collect();
        Err(NodeError::Registration {
            pending,
            passes: retry_limit,
        })
    }
}
