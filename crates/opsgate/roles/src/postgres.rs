//! PostgreSQL adapter for role records.
//!
//! Each record is stored as a JSONB document in `opsgate_roles`, keyed by user
//! id, so the table behaves like the document collection the dashboard reads.
//! Merges run inside one transaction with the row locked.

use crate::traits::RoleStore;
use crate::{RoleStoreError, RoleStoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opsgate_types::{RolePatch, RoleRecord, UserId};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::debug;

/// PostgreSQL-backed role store.
#[derive(Clone)]
pub struct PostgresRoleStore {
    pool: PgPool,
}

impl PostgresRoleStore {
    /// Connect to PostgreSQL and initialize the collection table.
    pub async fn connect(database_url: &str) -> RoleStoreResult<Self> {
        Self::connect_with_options(database_url, 5, 5).await
    }

    /// Connect with explicit pool parameters.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> RoleStoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| RoleStoreError::Backend(format!("failed to connect postgres: {e}")))?;
        Self::from_pool(pool).await
    }

    /// Create adapter from an existing pool.
    pub async fn from_pool(pool: PgPool) -> RoleStoreResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> RoleStoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS opsgate_roles (
                user_id TEXT PRIMARY KEY,
                document JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}

fn backend(err: sqlx::Error) -> RoleStoreError {
    RoleStoreError::Backend(err.to_string())
}

fn decode(row: &sqlx::postgres::PgRow) -> RoleStoreResult<RoleRecord> {
    let document: serde_json::Value = row.try_get("document").map_err(backend)?;
    Ok(serde_json::from_value(document)?)
}

#[async_trait]
impl RoleStore for PostgresRoleStore {
    async fn get(&self, user_id: &UserId) -> RoleStoreResult<Option<RoleRecord>> {
        let row = sqlx::query("SELECT document FROM opsgate_roles WHERE user_id = $1")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(decode).transpose()
    }

    async fn merge(
        &self,
        user_id: &UserId,
        patch: RolePatch,
        now: DateTime<Utc>,
    ) -> RoleStoreResult<RoleRecord> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let existing = sqlx::query("SELECT document FROM opsgate_roles WHERE user_id = $1 FOR UPDATE")
            .bind(user_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?;
        let existing = existing.as_ref().map(decode).transpose()?;

        let merged = patch.apply(user_id, existing, now);
        let document = serde_json::to_value(&merged)?;

        sqlx::query(
            r#"
            INSERT INTO opsgate_roles (user_id, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
               SET document = EXCLUDED.document,
                   updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id.as_str())
        .bind(document)
        .bind(merged.created_at)
        .bind(merged.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        debug!(user_id = %user_id, role = %merged.role, "role record merged");
        Ok(merged)
    }
}
