//! OpsGate Authz - admin capability resolution
//!
//! A user is an admin when they are on the configured allow-list, or when
//! their role record says `admin`. Everything else is `false`: a failed or
//! missing lookup never grants elevated capability.

#![deny(unsafe_code)]

mod bootstrap;

pub use bootstrap::{bootstrap_admin, BootstrapError, BootstrapRequest};

use futures::future::{BoxFuture, FutureExt, Shared};
use opsgate_roles::RoleStore;
use opsgate_types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Static set of users granted admin capability unconditionally.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminAllowList(BTreeSet<UserId>);

impl AdminAllowList {
    pub fn new<I, U>(ids: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UserId>,
    {
        Self(ids.into_iter().map(Into::into).collect())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.0.contains(user_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserId> {
        self.0.iter()
    }
}

/// Where an admin decision came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminSource {
    AllowList,
    RoleRecord,
    None,
}

/// Capabilities exposed to dashboard surfaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub is_admin: bool,
    pub source: AdminSource,
}

impl Capabilities {
    pub fn standard() -> Self {
        Self {
            is_admin: false,
            source: AdminSource::None,
        }
    }
}

type SharedLookup = Shared<BoxFuture<'static, bool>>;
type InFlight = HashMap<UserId, (u64, SharedLookup)>;

/// Fail-closed admin check over an allow-list and a role store.
pub struct AuthorizationCheck {
    allow_list: AdminAllowList,
    store: Arc<dyn RoleStore>,
    in_flight: Mutex<InFlight>,
    next_lookup: Mutex<u64>,
}

impl AuthorizationCheck {
    pub fn new(allow_list: AdminAllowList, store: Arc<dyn RoleStore>) -> Self {
        Self {
            allow_list,
            store,
            in_flight: Mutex::new(HashMap::new()),
            next_lookup: Mutex::new(0),
        }
    }

    pub fn allow_list(&self) -> &AdminAllowList {
        &self.allow_list
    }

    /// Resolve whether `user_id` holds admin capability.
    pub async fn is_admin(&self, user_id: &UserId) -> bool {
        self.capabilities(user_id).await.is_admin
    }

    /// Resolve capabilities together with the source of the decision.
    pub async fn capabilities(&self, user_id: &UserId) -> Capabilities {
        if self.allow_list.contains(user_id) {
            debug!(user_id = %user_id, "admin via allow-list");
            return Capabilities {
                is_admin: true,
                source: AdminSource::AllowList,
            };
        }

        if self.role_is_admin(user_id).await {
            Capabilities {
                is_admin: true,
                source: AdminSource::RoleRecord,
            }
        } else {
            Capabilities::standard()
        }
    }

    /// Look up the role record, sharing one outstanding lookup per user.
    async fn role_is_admin(&self, user_id: &UserId) -> bool {
        let (ticket, lookup) = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(user_id) {
                Some((ticket, lookup)) => (*ticket, lookup.clone()),
                None => {
                    let ticket = {
                        let mut next = lock(&self.next_lookup);
                        *next += 1;
                        *next
                    };
                    let store = Arc::clone(&self.store);
                    let target = user_id.clone();
                    let lookup = async move { lookup_role(store.as_ref(), &target).await }
                        .boxed()
                        .shared();
                    in_flight.insert(user_id.clone(), (ticket, lookup.clone()));
                    (ticket, lookup)
                }
            }
        };

        let _release = InFlightRelease {
            in_flight: &self.in_flight,
            user_id,
            ticket,
        };
        lookup.await
    }
}

/// Clears a user's in-flight entry once a waiter finishes or is cancelled,
/// so later checks never join a lookup that started before them.
struct InFlightRelease<'a> {
    in_flight: &'a Mutex<InFlight>,
    user_id: &'a UserId,
    ticket: u64,
}

impl Drop for InFlightRelease<'_> {
    fn drop(&mut self) {
        let mut in_flight = lock(self.in_flight);
        if in_flight
            .get(self.user_id)
            .is_some_and(|(current, _)| *current == self.ticket)
        {
            in_flight.remove(self.user_id);
        }
    }
}

async fn lookup_role(store: &dyn RoleStore, user_id: &UserId) -> bool {
    match store.get(user_id).await {
        Ok(Some(record)) => record.role.is_admin(),
        Ok(None) => {
            debug!(user_id = %user_id, "no role record; treating as standard");
            false
        }
        Err(err) => {
            warn!(user_id = %user_id, error = %err, "role lookup failed; denying admin");
            false
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
