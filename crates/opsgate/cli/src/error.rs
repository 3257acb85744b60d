//! CLI error types

use opsgate_authz::BootstrapError;
use opsgate_config::ConfigError;
use opsgate_roles::RoleStoreError;
use thiserror::Error;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Role store could not be opened
    #[error("Role store error: {0}")]
    Store(#[from] RoleStoreError),

    /// Admin bootstrap failed
    #[error("Bootstrap failed: {0}")]
    Bootstrap(#[from] BootstrapError),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
