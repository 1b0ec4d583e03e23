//! CLI Handler for Nodeward
//!
//! Provides command-line interface functionality for:
//! - Running the node controller
//! - Checking and generating configuration
//! - One-off health probes against a node

use crate::config::Config;
use crate::error::NodeError;
use crate::health::{HealthChecker, ProbeResult};
use crate::startup;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the node controller until interrupted
    Run {
        /// Configuration file; the default locations are searched when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the reconciliation period, in seconds
        #[arg(long)]
        period: Option<u64>,
        /// Do not sync the node list from the inventory provider
        #[arg(long)]
        no_sync_node_list: bool,
    },
    /// Validate a configuration file
    CheckConfig {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Write a default configuration file
    InitConfig {
        #[arg(short, long, default_value = "nodeward.yml")]
        path: PathBuf,
    },
    /// Probe the health endpoint of a single node
    Probe {
        node: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub struct CliHandler;

impl CliHandler {
    pub fn load_config(path: Option<&Path>) -> Result<Config, NodeError> {
        match path {
            Some(path) => Config::load_from_file(path),
            None => Config::load_default(),
        }
    }

    pub async fn handle(cli: Cli) -> Result<(), NodeError> {
        match cli.command {
            Commands::Run {
                config,
                period,
                no_sync_node_list,
            } => {
                let mut config = Self::load_config(config.as_deref())?;
                if let Some(period) = period {
                    config.controller.period_secs = period;
                }
                if no_sync_node_list {
                    config.controller.sync_node_list = false;
                }
                crate::logging::init(&config.logging)?;
                Self::run(config).await
            }
            Commands::CheckConfig { config } => {
                let config = Self::load_config(config.as_deref())?;
                config.validate()?;
                println!("{}", serde_yaml::to_string(&config)?);
                println!("Configuration is valid");
                Ok(())
            }
            Commands::InitConfig { path } => {
                if path.exists() {
                    return Err(NodeError::config(format!("{} already exists", path.display())));
                }
                Config::default().save(&path)?;
                println!("Wrote default configuration to {}", path.display());
                Ok(())
            }
            Commands::Probe { node, config } => {
                let config = Self::load_config(config.as_deref())?;
                let checker = startup::health_checker(&config)?;
                match checker.health_check(&node).await {
                    Ok(ProbeResult::Success) => println!("{}: ready", node),
                    Ok(ProbeResult::Failure) => println!("{}: not ready", node),
                    Err(e) => println!("{}: unknown ({})", node, e),
                }
                Ok(())
            }
        }
    }

    /// Runs the controller until Ctrl-C.
    pub async fn run(config: Config) -> Result<(), NodeError> {
        let controller = startup::build_controller(&config)?;
        let period = config.controller.period();

        let (tx, mut rx) = mpsc::channel(1);
        ctrlc::set_handler(move || {
            let _ = tx.blocking_send(());
        })
        .map_err(|e| NodeError::config(format!("Error setting Ctrl-C handler: {}", e)))?;

        let handle = match controller.run(period, config.controller.sync_node_list).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("Node controller failed to start: {}", e);
                return Err(e);
            }
        };

        rx.recv().await;
        info!("Interrupt received, shutting down");
        tokio::time::timeout(Duration::from_secs(30), handle.stop())
            .await
            .map_err(|_| NodeError::config("timed out waiting for sync cycles to stop"))?;
        Ok(())
    }
}
