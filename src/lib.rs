pub mod cli;
pub mod cloud;
pub mod config;
pub mod controller;
pub mod error;
pub mod health;
pub mod logging;
pub mod startup;
pub mod store;
pub mod types;

// Re-export common types
pub use config::Config;
pub use controller::{ControllerHandle, NodeController};
pub use error::{NodeError, Result};
