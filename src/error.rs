use thiserror::Error;

/// Errors reported by a cluster state store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        StoreError::Backend(msg.into())
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Errors reported by an inventory provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CloudError {
    #[error("instance {0} not found")]
    NotFound(String),

    #[error("invalid instance match pattern: {0}")]
    InvalidPattern(String),

    #[error("provider error: {0}")]
    Backend(String),
}

/// Transport-level failure of a single health probe.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ProbeError(pub String);

impl From<reqwest::Error> for ProbeError {
    fn from(e: reqwest::Error) -> Self {
        ProbeError(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum NodeError {
    /// The bootstrap registration ran out of passes with nodes left over.
    #[error("unable to register all nodes: {} still unregistered after {passes} passes", .pending.len())]
    Registration { pending: Vec<String>, passes: u32 },

    #[error("provider does not support instance queries")]
    ProviderUnsupported,

    #[error("unable to enumerate inventory instances: {0}")]
    Enumeration(#[source] CloudError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, NodeError>;

impl NodeError {
    pub fn config(msg: impl Into<String>) -> Self {
        NodeError::Config(msg.into())
    }

    /// Failures that only cost the current tick; the next tick retries.
    pub fn is_cycle_fatal(&self) -> bool {
        matches!(
            self,
            NodeError::ProviderUnsupported | NodeError::Enumeration(_) | NodeError::Store(_)
        )
    }
}
