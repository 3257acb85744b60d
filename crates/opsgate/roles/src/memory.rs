//! In-memory reference implementation of [`RoleStore`].
//!
//! Deterministic and test-friendly. Failures and latency can be injected to
//! exercise the fail-closed paths of the authorization check.

use crate::traits::RoleStore;
use crate::{RoleStoreError, RoleStoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opsgate_types::{RolePatch, RoleRecord, UserId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// In-memory role store adapter.
#[derive(Default)]
pub struct InMemoryRoleStore {
    records: RwLock<HashMap<UserId, RoleRecord>>,
    read_failure: RwLock<Option<String>>,
    write_failure: RwLock<Option<String>>,
    latency: RwLock<Option<Duration>>,
    lookups: AtomicUsize,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing merge semantics.
    pub fn insert(&self, record: RoleRecord) -> RoleStoreResult<()> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| RoleStoreError::Backend("role records lock poisoned".to_string()))?;
        guard.insert(record.user_id.clone(), record);
        Ok(())
    }

    /// Make every `get` fail with a backend error.
    pub fn fail_reads(&self, reason: impl Into<String>) {
        write_slot(&self.read_failure, Some(reason.into()));
    }

    /// Make every `merge` fail with a backend error.
    pub fn fail_writes(&self, reason: impl Into<String>) {
        write_slot(&self.write_failure, Some(reason.into()));
    }

    pub fn clear_failures(&self) {
        write_slot(&self.read_failure, None);
        write_slot(&self.write_failure, None);
    }

    /// Delay every `get` by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        write_slot(&self.latency, Some(latency));
    }

    /// Number of `get` calls served so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn write_slot<T>(slot: &RwLock<Option<T>>, value: Option<T>) {
    let mut guard = match slot.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = value;
}

fn read_slot<T: Clone>(slot: &RwLock<Option<T>>) -> Option<T> {
    slot.read().ok().and_then(|guard| guard.clone())
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn get(&self, user_id: &UserId) -> RoleStoreResult<Option<RoleRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = read_slot(&self.latency) {
            tokio::time::sleep(latency).await;
        }
        if let Some(reason) = read_slot(&self.read_failure) {
            return Err(RoleStoreError::Backend(reason));
        }

        let guard = self
            .records
            .read()
            .map_err(|_| RoleStoreError::Backend("role records lock poisoned".to_string()))?;
        Ok(guard.get(user_id).cloned())
    }

    async fn merge(
        &self,
        user_id: &UserId,
        patch: RolePatch,
        now: DateTime<Utc>,
    ) -> RoleStoreResult<RoleRecord> {
        if let Some(reason) = read_slot(&self.write_failure) {
            return Err(RoleStoreError::Backend(reason));
        }

        let mut guard = self
            .records
            .write()
            .map_err(|_| RoleStoreError::Backend("role records lock poisoned".to_string()))?;
        let merged = patch.apply(user_id, guard.remove(user_id), now);
        guard.insert(user_id.clone(), merged.clone());
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use opsgate_types::Role;

    fn at(month: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_get_missing_record_is_none() {
        let store = InMemoryRoleStore::new();
        assert!(store.get(&UserId::new("nobody")).await.unwrap().is_none());
        assert_eq!(store.lookup_count(), 1);
    }

    #[tokio::test]
    async fn test_merge_creates_then_preserves_created_at() {
        let store = InMemoryRoleStore::new();
        let user = UserId::new("U1");

        let first = store
            .merge(&user, RolePatch::admin(Some("ops@example.com".into())), at(1))
            .await
            .unwrap();
        let second = store
            .merge(
                &user,
                RolePatch {
                    role: Some(Role::Standard),
                    email: None,
                },
                at(2),
            )
            .await
            .unwrap();

        assert_eq!(first.created_at, at(1));
        assert_eq!(second.created_at, at(1));
        assert_eq!(second.updated_at, at(2));
        assert_eq!(second.role, Role::Standard);
        assert_eq!(second.email, "ops@example.com");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = InMemoryRoleStore::new();
        store.fail_reads("connection reset");
        store.fail_writes("permission denied");

        let user = UserId::new("U1");
        assert!(matches!(
            store.get(&user).await,
            Err(RoleStoreError::Backend(_))
        ));
        assert!(store
            .merge(&user, RolePatch::admin(Some("x@example.com".into())), at(1))
            .await
            .is_err());
        assert!(store.is_empty());

        store.clear_failures();
        assert!(store.get(&user).await.unwrap().is_none());
    }
}
