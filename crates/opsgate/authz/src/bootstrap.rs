//! Administrative bootstrap: grant the admin role to one user.
//!
//! This is the only write path for role records. It merges rather than
//! replaces, so running it again leaves `created_at` untouched.

use chrono::{DateTime, Utc};
use opsgate_roles::{RoleStore, RoleStoreError};
use opsgate_types::{RolePatch, RoleRecord, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

/// Target of an admin bootstrap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapRequest {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl BootstrapRequest {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Bootstrap failures. These are terminal for the caller.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("invalid user id: {0:?}")]
    InvalidUserId(String),

    #[error("role store write failed: {0}")]
    Store(#[from] RoleStoreError),
}

/// Merge `{ role: admin, email }` into the target user's role record.
///
/// Without an email the stored one is kept.
pub async fn bootstrap_admin(
    store: &dyn RoleStore,
    request: &BootstrapRequest,
    now: DateTime<Utc>,
) -> Result<RoleRecord, BootstrapError> {
    let user_id = UserId::parse(request.user_id.as_str())
        .ok_or_else(|| BootstrapError::InvalidUserId(request.user_id.0.clone()))?;

    let record = store
        .merge(&user_id, RolePatch::admin(request.email.clone()), now)
        .await
        .map_err(|err| {
            error!(user_id = %user_id, error = %err, "admin bootstrap failed");
            BootstrapError::Store(err)
        })?;

    info!(
        user_id = %record.user_id,
        created_at = %record.created_at,
        "admin role granted"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use opsgate_roles::{InMemoryRoleStore, RoleStore};
    use opsgate_types::Role;

    #[tokio::test]
    async fn test_bootstrap_is_idempotent_and_keeps_first_created_at() {
        let store = InMemoryRoleStore::new();
        let first_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let second_at = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();

        let first = bootstrap_admin(
            &store,
            &BootstrapRequest::new("U1").with_email("first@example.com"),
            first_at,
        )
        .await
        .unwrap();
        let second = bootstrap_admin(
            &store,
            &BootstrapRequest::new("U1").with_email("second@example.com"),
            second_at,
        )
        .await
        .unwrap();

        assert_eq!(first.created_at, first_at);
        assert_eq!(second.created_at, first_at);
        assert_eq!(second.role, Role::Admin);
        assert_eq!(second.email, "second@example.com");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_promotes_existing_standard_user() {
        let store = InMemoryRoleStore::new();
        let created = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        store
            .insert(RoleRecord {
                user_id: UserId::new("U7"),
                role: Role::Standard,
                email: "u7@example.com".into(),
                created_at: created,
                updated_at: created,
            })
            .unwrap();

        let record = bootstrap_admin(
            &store,
            &BootstrapRequest::new("U7").with_email("u7@example.com"),
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(record.role, Role::Admin);
        assert_eq!(record.created_at, created);
    }

    #[tokio::test]
    async fn test_bootstrap_without_email_keeps_stored_email() {
        let store = InMemoryRoleStore::new();
        let created = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        store
            .insert(RoleRecord {
                user_id: UserId::new("U7"),
                role: Role::Standard,
                email: "u7@example.com".into(),
                created_at: created,
                updated_at: created,
            })
            .unwrap();

        let record = bootstrap_admin(&store, &BootstrapRequest::new("U7"), Utc::now())
            .await
            .unwrap();
        assert_eq!(record.role, Role::Admin);
        assert_eq!(record.email, "u7@example.com");

        let stored = store.get(&UserId::new("U7")).await.unwrap().unwrap();
        assert_eq!(stored.email, "u7@example.com");
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_blank_user_id() {
        let store = InMemoryRoleStore::new();
        let request = BootstrapRequest::new("  ").with_email("x@example.com");
        let err = bootstrap_admin(&store, &request, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidUserId(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_propagates_store_failure() {
        let store = InMemoryRoleStore::new();
        store.fail_writes("permission denied");
        let request = BootstrapRequest::new("U1").with_email("x@example.com");
        let err = bootstrap_admin(&store, &request, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, BootstrapError::Store(RoleStoreError::Backend(_))));
    }
}
