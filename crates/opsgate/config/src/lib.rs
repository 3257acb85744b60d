//! Configuration for OpsGate
//!
//! Sources are layered: built-in defaults, then an optional file, then
//! `OPSGATE_*` environment variables (`__` separates nested keys, e.g.
//! `OPSGATE_BOOTSTRAP__USER_ID`; the allow-list is comma separated).

#![deny(unsafe_code)]

use opsgate_authz::{AdminAllowList, BootstrapRequest};
use opsgate_types::{RoutePaths, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    /// Navigation targets
    #[serde(default)]
    pub routes: RoutePaths,

    /// Authorization configuration
    #[serde(default)]
    pub authz: AuthzConfig,

    /// Role store backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Admin bootstrap target
    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Authorization configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthzConfig {
    /// Users granted admin regardless of their role record
    #[serde(default)]
    pub admin_allow_list: Vec<String>,
}

/// Role store backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// In-memory store (development/testing; nothing survives the process)
    #[default]
    Memory,

    /// PostgreSQL document table
    Postgres {
        /// Connection URL
        url: String,

        /// Maximum connections in pool
        #[serde(default = "default_pool_size")]
        max_connections: u32,

        /// Connection timeout in seconds
        #[serde(default = "default_connection_timeout")]
        connect_timeout_secs: u64,
    },
}

/// Admin bootstrap target
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_pool_size() -> u32 {
    5
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl GateConfig {
    /// Load configuration from defaults, an optional file and the environment.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Self::defaults_builder()?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("OPSGATE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("authz.admin_allow_list")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML text on top of the defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = Self::defaults_builder()?
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn defaults_builder(
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Ok(config::Config::builder().add_source(config::Config::try_from(&Self::default())?))
    }

    /// Reject values the gate cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, path) in [
            ("routes.login", &self.routes.login),
            ("routes.dashboard", &self.routes.dashboard),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "{name} must start with '/', got {path:?}"
                )));
            }
        }

        if self.authz.admin_allow_list.iter().any(|id| UserId::parse(id).is_none()) {
            return Err(ConfigError::Invalid(
                "authz.admin_allow_list contains a blank user id".to_string(),
            ));
        }

        if let StoreConfig::Postgres { url, .. } = &self.store {
            if url.trim().is_empty() {
                return Err(ConfigError::Invalid("store.url must not be empty".to_string()));
            }
        }

        Ok(())
    }

    /// Allow-list as an explicit value for the authorization check.
    pub fn allow_list(&self) -> AdminAllowList {
        AdminAllowList::new(
            self.authz
                .admin_allow_list
                .iter()
                .filter_map(|id| UserId::parse(id)),
        )
    }

    /// Bootstrap target, with optional overrides taking precedence.
    pub fn bootstrap_request(
        &self,
        user_id: Option<&str>,
        email: Option<&str>,
    ) -> Result<BootstrapRequest, ConfigError> {
        let raw_user = user_id
            .or(self.bootstrap.user_id.as_deref())
            .ok_or_else(|| ConfigError::Invalid("bootstrap.user_id is not set".to_string()))?;
        let user_id = UserId::parse(raw_user).ok_or_else(|| {
            ConfigError::Invalid("bootstrap.user_id must not be blank".to_string())
        })?;
        let email = email
            .or(self.bootstrap.email.as_deref())
            .map(str::trim)
            .filter(|email| !email.is_empty());

        let request = BootstrapRequest::new(user_id);
        Ok(match email {
            Some(email) => request.with_email(email),
            None => request,
        })
    }
}
