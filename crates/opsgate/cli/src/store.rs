//! Role store construction from configuration

use std::sync::Arc;

use opsgate_config::StoreConfig;
use opsgate_roles::postgres::PostgresRoleStore;
use opsgate_roles::{InMemoryRoleStore, RoleStore};
use tracing::{info, warn};

use crate::error::CliResult;

/// Open the configured role store.
pub async fn open(config: &StoreConfig) -> CliResult<Arc<dyn RoleStore>> {
    match config {
        StoreConfig::Memory => {
            warn!("using in-memory role store; writes are discarded on exit");
            Ok(Arc::new(InMemoryRoleStore::new()))
        }
        StoreConfig::Postgres {
            url,
            max_connections,
            connect_timeout_secs,
        } => {
            let store = PostgresRoleStore::connect_with_options(
                url,
                *max_connections,
                *connect_timeout_secs,
            )
            .await?;
            info!("connected to postgres role store");
            Ok(Arc::new(store))
        }
    }
}
