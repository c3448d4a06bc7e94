//! Error types for apiary-core

use thiserror::Error;

use crate::model::EndpointKey;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the registries and the storage layer beneath them
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A registry was used before an application namespace was bound
    #[error("Store not initialized: no application namespace is bound")]
    NotInitialized,

    /// The addressed record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The tab registry is full; the caller should offer to close tabs
    #[error("Tab limit exceeded: at most {limit} tabs may be open")]
    LimitExceeded { limit: usize },

    /// A record with the same (path, method) already exists
    #[error("Duplicate entry for {0}")]
    Duplicate(EndpointKey),

    /// The underlying database failed to open or commit
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The application name does not produce a usable namespace
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    /// A stored record body could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether the UI should present the "close tabs" affordance.
    pub fn is_limit_exceeded(&self) -> bool {
        matches!(self, StoreError::LimitExceeded { .. })
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::StorageUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::StorageUnavailable(format!("storage task failed: {}", err))
    }
}
