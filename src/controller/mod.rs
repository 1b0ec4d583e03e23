//! Node Lifecycle Controller
//!
//! Reconciles the node registry against the fleet:
//! - Inventory and static node sources
//! - Address resolution
//! - Registration with retries
//! - Workload eviction from unhealthy nodes
//! - The periodic inventory-diff and status-sync cycles

pub mod address;
pub mod eviction;
pub mod inventory;
pub mod manager;
pub mod registrar;

// Re-export commonly used types
pub use address::{AddressResolver, NameResolver, StaticHostsResolver, SystemResolver};
pub use eviction::{should_evict, PodEvictor};
pub use inventory::Inventory;
pub use manager::{CloudSyncReport, ControllerHandle, ControllerSettings, NodeController};
pub use registrar::Registrar;
