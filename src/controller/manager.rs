//! Node Controller Implementation
//!
//! Handles:
//! - Bootstrap registration of the initial fleet
//! - Inventory diffing (create / delete node records)
//! - Periodic health status sync and workload eviction
//! - Lifecycle of the periodic background tasks

use super::address::{AddressResolver, NameResolver};
use super::eviction::PodEvictor;
use super::inventory::Inventory;
use super::registrar::Registrar;
use crate::error::NodeError;
use crate::health::{HealthChecker, HealthProber};
use crate::store::ClusterStore;
use crate::types::{canonicalize_names, Node};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Tunables of the controller that are not collaborators.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Passes the bootstrap registration may make
    pub register_retry_count: u32,
    /// Wait between registration passes; the run period when unset
    pub register_retry_interval: Option<Duration>,
    /// How long a node may stay not-ready before its workloads are evicted
    pub pod_eviction_timeout: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            register_retry_count: 10,
            register_retry_interval: None,
            pod_eviction_timeout: Duration::from_secs(300),
        }
    }
}

/// What one inventory-diff tick changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudSyncReport {
    pub created: Vec<String>,
    pub deleted: Vec<String>,
}

/// Keeps the store's node records in line with the fleet
#[derive(Clone)]
pub struct NodeController {
    inventory: Inventory,
    store: Arc<dyn ClusterStore>,
    prober: HealthProber,
    evictor: PodEvictor,
    registrar: Registrar,
    name_resolver: Arc<dyn NameResolver>,
    settings: ControllerSettings,
}

impl NodeController {
    pub fn new(
        inventory: Inventory,
        store: Arc<dyn ClusterStore>,
        checker: Arc<dyn HealthChecker>,
        name_resolver: Arc<dyn NameResolver>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            inventory,
            prober: HealthProber::new(checker),
            evictor: PodEvictor::new(store.clone(), settings.pod_eviction_timeout),
            registrar: Registrar::new(store.clone()),
            store,
            name_resolver,
            settings,
        }
    }

    /// Registers the initial fleet, then starts the periodic cycles.
    ///
    /// The inventory-diff cycle only runs when `sync_node_list` is set and
    /// inventory mode is active; the status-sync cycle always runs. Fails
    /// without starting anything if the initial fleet cannot be registered.
    pub async fn run(
        &self,
        period: Duration,
        sync_node_list: bool,
    ) -> Result<ControllerHandle, NodeError> {
        if period.is_zero() {
            return Err(NodeError::config("reconciliation period must be positive"));
        }
        self.bootstrap(period, sync_node_list).await?;

        let token = CancellationToken::new();
        let mut tasks = Vec::with_capacity(2);

        if sync_node_list && self.inventory.is_running_cloud_provider() {
            let controller = self.clone();
            tasks.push(spawn_cycle("cloud", period, token.child_token(), move || {
                let controller = controller.clone();
                async move {
                    let report = controller.sync_cloud().await?;
                    debug!("cloud sync created {:?}, deleted {:?}", report.created, report.deleted);
                    Ok::<(), NodeError>(())
                }
            }));
        }

        let controller = self.clone();
        tasks.push(spawn_cycle("status", period, token.child_token(), move || {
            let controller = controller.clone();
            async move { controller.sync_node_status().await }
        }));

        info!("Node controller running with period {:?}", period);
        Ok(ControllerHandle { token, tasks })
    }

    /// Builds the initial node set, probes it once and registers it.
    pub async fn bootstrap(&self, period: Duration, sync_node_list: bool) -> Result<(), NodeError> {
        let nodes = self.initial_nodes(sync_node_list).await;
        let mut nodes = self.do_checks(nodes).await;
        if let Err(e) = self.populate_ips(&mut nodes).await {
            error!("Error getting nodes ips: {}", e);
        }
        self.evict_unhealthy(&nodes).await;

        let retry_interval = self.settings.register_retry_interval.unwrap_or(period);
        self.register_nodes(nodes, self.settings.register_retry_count, retry_interval)
            .await
    }

    async fn initial_nodes(&self, sync_node_list: bool) -> Vec<Node> {
        if !self.inventory.is_running_cloud_provider() {
            return self.inventory.static_nodes();
        }
        if !sync_node_list {
            return Vec::new();
        }
        match self.inventory.cloud_nodes().await {
            Ok(nodes) => nodes,
            Err(e) => {
                error!("Error loading initial node from cloudprovider: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn register_nodes(
        &self,
        nodes: Vec<Node>,
        retry_count: u32,
        retry_interval: Duration,
    ) -> Result<(), NodeError> {
        self.registrar.register(nodes, retry_count, retry_interval).await
    }

    /// One inventory-diff tick: creates records for new instances and
    /// deletes records (and their workloads) whose instance disappeared.
    pub async fn sync_cloud(&self) -> Result<CloudSyncReport, NodeError> {
        let matches = canonicalize_names(self.inventory.cloud_nodes().await?);
        let registered = self.store.list_nodes().await?;

        let mut stale: HashSet<String> = registered.into_iter().map(|n| n.name).collect();
        let mut report = CloudSyncReport::default();

        for node in &matches {
            if stale.remove(&node.name) {
                continue;
            }
            info!("Create node in registry: {}", node.name);
            match self.store.create_node(node).await {
                Ok(_) => report.created.push(node.name.clone()),
                Err(e) => error!("Create node {} error: {}", node.name, e),
            }
        }

        let mut stale: Vec<String> = stale.into_iter().collect();
        stale.sort();
        for name in stale {
            info!("Delete node from registry: {}", name);
            if let Err(e) = self.store.delete_node(&name).await {
                error!("Delete node {} error: {}", name, e);
            }
            if let Err(e) = self.evictor.delete_workloads(&name).await {
                error!("Error deleting workloads of removed node {}: {}", name, e);
            }
            report.deleted.push(name);
        }

        Ok(report)
    }

    /// One status-sync tick: probes every registered node, refreshes its
    /// address, evicts where due and writes every node back.
    pub async fn sync_node_status(&self) -> Result<(), NodeError> {
        let nodes = self.store.list_nodes().await?;
        let mut nodes = self.do_checks(nodes).await;
        self.populate_ips(&mut nodes).await?;
        self.evict_unhealthy(&nodes).await;

        for node in &nodes {
            // the probe time always moves, so every node is written
            debug!("updating node {}", node.name);
            if let Err(e) = self.store.update_node(node).await {
                error!("error updating node {}: {}", node.name, e);
            }
        }
        Ok(())
    }

    /// Health-checks the given nodes.
    pub async fn do_checks(&self, nodes: Vec<Node>) -> Vec<Node> {
        self.prober.evaluate(nodes).await
    }

    pub async fn populate_ips(&self, nodes: &mut [Node]) -> Result<(), NodeError> {
        self.address_resolver()?.populate(nodes).await;
        Ok(())
    }

    fn address_resolver(&self) -> Result<AddressResolver, NodeError> {
        if self.inventory.is_running_cloud_provider() {
            Ok(AddressResolver::Provider(self.inventory.instances()?))
        } else {
            Ok(AddressResolver::Dns(self.name_resolver.clone()))
        }
    }

    async fn evict_unhealthy(&self, nodes: &[Node]) {
        for node in nodes {
            if let Err(e) = self.evictor.maybe_evict(node).await {
                warn!("Error evicting workloads from {}: {}", node.name, e);
            }
        }
    }
}

fn spawn_cycle<F, Fut>(
    name: &'static str,
    period: Duration,
    token: CancellationToken,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), NodeError>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    match tick().await {
                        Ok(()) => {}
                        Err(e) if e.is_cycle_fatal() => warn!("Skipping {} tick: {}", name, e),
                        Err(e) => error!("Error syncing {}: {}", name, e),
                    }
                }
            }
        }
        debug!("{} sync cycle stopped", name);
    })
}

/// Owns the periodic cycles started by [`NodeController::run`].
pub struct ControllerHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ControllerHandle {
    /// Number of periodic cycles this handle supervises.
    pub fn cycles(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }

    /// Stops every cycle, letting a tick in progress finish first.
    pub async fn stop(self) {
        info!("Stopping node controller");
        self.token.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                error!("sync cycle ended abnormally: {}", e);
            }
        }
    }
}
