use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("upgrade request {0} not found")]
    UpgradeRequestNotFound(i64),

    #[error("unknown plan: {0}")]
    InvalidPlan(String),

    #[error("unknown upgrade status: {0}")]
    InvalidStatus(String),

    /// Storage-layer failure, propagated unmodified from the backend.
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
