use super::ClusterStore;
use crate::error::StoreError;
use crate::types::{Node, Workload};
use async_trait::async_trait;
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ItemList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// Store client for a REST API server exposing `/api/v1` node and pod
/// collections.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let base_url: String = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| StoreError::backend(format!("invalid api server url {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::backend(format!("api server url {} cannot be a base", base_url)));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Builds `{base}/api/v1/{segments...}`, percent-encoding each segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").push("v1").extend(segments);
        }
        url
    }

    async fn list<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Vec<T>, StoreError> {
        let url = self.url(segments);
        let resp = self.client.get(url.clone()).send().await?;
        let resp = check_status(resp, url.path()).await?;
        Ok(resp.json::<ItemList<T>>().await?.items)
    }
}

/// Maps API status codes onto store error kinds.
async fn check_status(resp: Response, subject: &str) -> Result<Response, StoreError> {
    match resp.status() {
        StatusCode::CONFLICT => Err(StoreError::AlreadyExists(subject.to_string())),
        StatusCode::NOT_FOUND => Err(StoreError::NotFound(subject.to_string())),
        status if status.is_success() => Ok(resp),
        status => {
            let body = resp.text().await.unwrap_or_default();
            Err(StoreError::Backend(format!(
                "{} returned {}: {}",
                subject,
                status,
                body.trim()
            )))
        }
    }
}

#[async_trait]
impl ClusterStore for HttpStore {
    async fn list_nodes(&self) -> Result<Vec<Node>, StoreError> {
        self.list(&["nodes"]).await
    }

    async fn create_node(&self, node: &Node) -> Result<Node, StoreError> {
        debug!("POST node {}", node.name);
        let resp = self.client.post(self.url(&["nodes"])).json(node).send().await?;
        let resp = check_status(resp, &node.name).await?;
        Ok(resp.json().await?)
    }

    async fn update_node(&self, node: &Node) -> Result<Node, StoreError> {
        let url = self.url(&["nodes", node.name.as_str()]);
        let resp = self.client.put(url).json(node).send().await?;
        let resp = check_status(resp, &node.name).await?;
        Ok(resp.json().await?)
    }

    async fn delete_node(&self, name: &str) -> Result<(), StoreError> {
        let resp = self.client.delete(self.url(&["nodes", name])).send().await?;
        check_status(resp, name).await.map(|_| ())
    }

    async fn list_workloads(&self, namespace: Option<&str>) -> Result<Vec<Workload>, StoreError> {
        match namespace {
            Some(ns) => self.list(&["namespaces", ns, "pods"]).await,
            None => self.list(&["pods"]).await,
        }
    }

    async fn delete_workload(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        let url = self.url(&["namespaces", namespace, "pods", name]);
        let resp = self.client.delete(url).send().await?;
        check_status(resp, &format!("{}/{}", namespace, name))
            .await
            .map(|_| ())
    }
}
