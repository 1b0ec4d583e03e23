//! Cluster State Store Contract
//!
//! The store persists node and workload records. Two implementations ship
//! with the crate: an in-process [`MemoryStore`] and an [`HttpStore`] talking
//! to a REST API server.

mod http;
mod memory;

pub use http::HttpStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::types::{Node, Workload};
use async_trait::async_trait;

#[async_trait]
pub trait ClusterStore: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<Node>, StoreError>;

    /// Fails with [`StoreError::AlreadyExists`] when the name is taken.
    async fn create_node(&self, node: &Node) -> Result<Node, StoreError>;

    async fn update_node(&self, node: &Node) -> Result<Node, StoreError>;

    async fn delete_node(&self, name: &str) -> Result<(), StoreError>;

    /// Lists workloads in `namespace`, or across all namespaces for `None`.
    /// There is no filtering by placement.
    async fn list_workloads(&self, namespace: Option<&str>) -> Result<Vec<Workload>, StoreError>;

    async fn delete_workload(&self, namespace: &str, name: &str) -> Result<(), StoreError>;
}
