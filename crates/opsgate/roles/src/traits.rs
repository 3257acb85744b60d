use crate::RoleStoreResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opsgate_types::{RolePatch, RoleRecord, UserId};

/// Storage interface for role records.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Read the record for a user. `Ok(None)` when no record exists.
    async fn get(&self, user_id: &UserId) -> RoleStoreResult<Option<RoleRecord>>;

    /// Merge fields into the user's record, creating it if absent.
    ///
    /// Fields missing from the patch keep their stored values and
    /// `created_at` is never overwritten. Returns the stored record.
    async fn merge(
        &self,
        user_id: &UserId,
        patch: RolePatch,
        now: DateTime<Utc>,
    ) -> RoleStoreResult<RoleRecord>;
}
