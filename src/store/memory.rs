use super::ClusterStore;
use crate::error::StoreError;
use crate::types::{Node, Workload};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// In-process store. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    nodes: Arc<DashMap<String, Node>>,
    workloads: Arc<DashMap<(String, String), Workload>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_node(&self, name: &str) -> Option<Node> {
        self.nodes.get(name).map(|n| n.value().clone())
    }

    pub fn node_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.nodes.iter().map(|n| n.key().clone()).collect();
        names.sort();
        names
    }

    /// Seeds a node record directly, bypassing create semantics.
    pub fn put_node(&self, node: Node) {
        self.nodes.insert(node.name.clone(), node);
    }

    pub fn put_workload(&self, workload: Workload) {
        self.workloads
            .insert((workload.namespace.clone(), workload.name.clone()), workload);
    }

    pub fn workload_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.workloads.iter().map(|w| w.value().name.clone()).collect();
        names.sort();
        names
    }
}

#[async_trait]
impl ClusterStore for MemoryStore {
    async fn list_nodes(&self) -> Result<Vec<Node>, StoreError> {
        let mut nodes: Vec<_> = self.nodes.iter().map(|n| n.value().clone()).collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(nodes)
    }

    async fn create_node(&self, node: &Node) -> Result<Node, StoreError> {
        match self.nodes.entry(node.name.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(node.name.clone())),
            Entry::Vacant(slot) => {
                let mut created = node.clone();
                created.uid.get_or_insert_with(Uuid::new_v4);
                debug!("memory store: created node {}", created.name);
                slot.insert(created.clone());
                Ok(created)
            }
        }
    }

    async fn update_node(&self, node: &Node) -> Result<Node, StoreError> {
        let mut existing = self
            .nodes
            .get_mut(&node.name)
            .ok_or_else(|| StoreError::NotFound(node.name.clone()))?;
        let uid = existing.uid;
        *existing = node.clone();
        existing.uid = uid;
        Ok(existing.clone())
    }

    async fn delete_node(&self, name: &str) -> Result<(), StoreError> {
        self.nodes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn list_workloads(&self, namespace: Option<&str>) -> Result<Vec<Workload>, StoreError> {
        let mut workloads: Vec<_> = self
            .workloads
            .iter()
            .filter(|w| namespace.map_or(true, |ns| w.value().namespace == ns))
            .map(|w| w.value().clone())
            .collect();
        workloads.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
        Ok(workloads)
    }

    async fn delete_workload(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.workloads
            .remove(&(namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", namespace, name)))
    }
}
