//! Node Health Checking
//!
//! Provides:
//! - The liveness transport contract ([`HealthChecker`])
//! - An HTTP implementation against each node agent's `/healthz`
//! - The prober that turns raw outcomes into readiness conditions

mod prober;

pub use prober::{ready_condition, HealthProber};

use crate::error::ProbeError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Raw outcome of a probe that reached the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    Success,
    Failure,
}

#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// Probes the agent on `node_name`. Transport failures are errors,
    /// an answering-but-unhealthy agent is `Ok(ProbeResult::Failure)`.
    async fn health_check(&self, node_name: &str) -> Result<ProbeResult, ProbeError>;
}

/// Probes `{scheme}://{node}:{port}{path}` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpHealthChecker {
    client: reqwest::Client,
    scheme: String,
    port: u16,
    path: String,
}

impl HttpHealthChecker {
    pub fn new(
        scheme: impl Into<String>,
        port: u16,
        path: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            scheme: scheme.into(),
            port,
            path: path.into(),
        })
    }

    fn url_for(&self, node_name: &str) -> String {
        format!("{}://{}:{}{}", self.scheme, node_name, self.port, self.path)
    }
}

#[async_trait]
impl HealthChecker for HttpHealthChecker {
    async fn health_check(&self, node_name: &str) -> Result<ProbeResult, ProbeError> {
        let url = self.url_for(node_name);
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        debug!("health probe {} returned {}", url, status);
        if status.is_success() || status.is_redirection() {
            Ok(ProbeResult::Success)
        } else {
            Ok(ProbeResult::Failure)
        }
    }
}
