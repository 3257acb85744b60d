//! OpsGate Types - shared vocabulary for the session gate
//!
//! Identifiers, roles and session states used by every OpsGate crate.
//! Nothing in here performs I/O.

#![deny(unsafe_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);
impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build an id from untrusted input, rejecting blank values.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A signed-in user as reported by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl AuthUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Authorization role stored in a role record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Standard,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Standard => "standard",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted role document, one per user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub user_id: UserId,
    pub role: Role,
    #[serde(default)]
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial role record used for merge writes. `None` keeps the stored value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl RolePatch {
    /// Grant admin. A missing or blank email leaves the stored one alone.
    pub fn admin(email: Option<String>) -> Self {
        Self {
            role: Some(Role::Admin),
            email: email
                .map(|email| email.trim().to_string())
                .filter(|email| !email.is_empty()),
        }
    }

    /// Apply this patch on top of an existing record, or create a fresh one.
    ///
    /// `created_at` is only ever assigned when no record exists yet.
    pub fn apply(
        &self,
        user_id: &UserId,
        existing: Option<RoleRecord>,
        now: DateTime<Utc>,
    ) -> RoleRecord {
        match existing {
            Some(mut record) => {
                if let Some(role) = self.role {
                    record.role = role;
                }
                if let Some(email) = &self.email {
                    record.email = email.clone();
                }
                record.updated_at = now;
                record
            }
            None => RoleRecord {
                user_id: user_id.clone(),
                role: self.role.unwrap_or_default(),
                email: self.email.clone().unwrap_or_default(),
                created_at: now,
                updated_at: now,
            },
        }
    }
}

/// Resolved state of one browser session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
    /// No identity state delivered yet.
    #[default]
    Loading,
    Authenticated { user_id: UserId },
    Unauthenticated,
    /// The identity provider could not be initialized.
    Failed { reason: String },
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SessionState::Failed { .. })
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            SessionState::Authenticated { user_id } => Some(user_id),
            _ => None,
        }
    }
}

/// Observable value published by the session gate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub is_admin: bool,
    /// Number of identity events applied so far.
    pub generation: u64,
}

/// Navigation targets owned by the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Login,
    Dashboard,
}

/// Paths the gate navigates to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePaths {
    pub login: String,
    pub dashboard: String,
}

impl RoutePaths {
    pub fn path(&self, route: Route) -> &str {
        match route {
            Route::Login => &self.login,
            Route::Dashboard => &self.dashboard,
        }
    }
}

impl Default for RoutePaths {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            dashboard: "/dashboard".to_string(),
        }
    }
}
