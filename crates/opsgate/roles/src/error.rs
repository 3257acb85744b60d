use thiserror::Error;

/// Result type for role store operations.
pub type RoleStoreResult<T> = Result<T, RoleStoreError>;

/// Role store errors.
#[derive(Debug, Error)]
pub enum RoleStoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for RoleStoreError {
    fn from(err: serde_json::Error) -> Self {
        RoleStoreError::Serialization(err.to_string())
    }
}
