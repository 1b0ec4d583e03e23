//! Workload eviction from nodes that stayed unhealthy too long.

use crate::error::StoreError;
use crate::store::ClusterStore;
use crate::types::{ConditionKind, Node, NodeCondition};
use chrono::TimeDelta;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// True when `condition` is not healthy and its last probe came more than
/// `timeout` after its last transition.
pub fn should_evict(condition: &NodeCondition, timeout: Duration) -> bool {
    if condition.is_healthy() {
        return false;
    }
    let timeout = TimeDelta::from_std(timeout).unwrap_or(TimeDelta::MAX);
    match condition.last_transition_time.checked_add_signed(timeout) {
        Some(deadline) => condition.last_probe_time > deadline,
        None => false,
    }
}

#[derive(Clone)]
pub struct PodEvictor {
    store: Arc<dyn ClusterStore>,
    timeout: Duration,
}

impl PodEvictor {
    pub fn new(store: Arc<dyn ClusterStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Purges the node's workloads if its readiness has been bad for longer
    /// than the eviction timeout. Returns whether a purge ran.
    ///
    /// Fires on every call while the condition holds; a purge that finds
    /// nothing left to delete is a no-op.
    pub async fn maybe_evict(&self, node: &Node) -> Result<bool, StoreError> {
        let Some(ready) = node.condition(ConditionKind::Ready) else {
            return Ok(false);
        };
        if !should_evict(ready, self.timeout) {
            return Ok(false);
        }
        info!(
            "node {} not ready ({}) since {}, evicting its workloads",
            node.name, ready.status, ready.last_transition_time
        );
        self.delete_workloads(&node.name).await?;
        Ok(true)
    }

    /// Deletes every workload placed on `node_name` and returns how many
    /// were deleted. Only a failure to list aborts; single deletions that
    /// fail are logged and skipped.
    pub async fn delete_workloads(&self, node_name: &str) -> Result<usize, StoreError> {
        debug!("Delete all workloads from {}", node_name);
        let workloads = self.store.list_workloads(None).await?;

        let mut deleted = 0;
        for workload in workloads.iter().filter(|w| w.is_placed_on(node_name)) {
            debug!("Delete workload {}/{}", workload.namespace, workload.name);
            match self
                .store
                .delete_workload(&workload.namespace, &workload.name)
                .await
            {
                Ok(()) => deleted += 1,
                Err(e) if e.is_not_found() => {
                    debug!("workload {}/{} already gone", workload.namespace, workload.name)
                }
                Err(e) => error!(
                    "Error deleting workload {}/{}: {}",
                    workload.namespace, workload.name, e
                ),
            }
        }
        Ok(deleted)
    }
}
