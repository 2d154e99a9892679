//! Error types for the dashboard view-model.

use thiserror::Error;

/// Dashboard errors surfaced to callers.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("Store error: {0}")]
    Store(#[from] health_store_client::HealthStoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Activity store task has stopped")]
    StoreClosed,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("health data access denied: {0}")]
    Denied(String),

    #[error("health data access has not been requested")]
    NotRequested,
}

/// Why a metric could not be published. Recorded, never propagated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("no samples recorded today")]
    NoData,

    #[error("query failed: {0}")]
    Store(String),
}

/// Result type alias for dashboard operations.
pub type DashboardResult<T> = Result<T, DashboardError>;
