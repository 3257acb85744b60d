//! In-memory identity provider.
//!
//! Deterministic reference adapter used by tests and local development. It
//! mirrors the behavior of a hosted auth SDK: the current user is replayed to
//! each new subscriber once the provider has initialized, and later changes
//! are pushed to every live subscriber.

use crate::{IdentityError, IdentityEvent, IdentityProvider, Subscription};
use async_trait::async_trait;
use opsgate_types::AuthUser;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Default)]
struct ProviderState {
    /// `None` until the provider has reported its initial state.
    current: Option<Option<AuthUser>>,
    init_failure: Option<String>,
    sign_out_failure: Option<String>,
    subscribers: HashMap<u64, mpsc::UnboundedSender<IdentityEvent>>,
    next_id: u64,
}

/// In-memory identity provider.
#[derive(Clone, Default)]
pub struct InMemoryIdentityProvider {
    state: Arc<RwLock<ProviderState>>,
}

impl InMemoryIdentityProvider {
    /// Create a provider that has not reported any state yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider already initialized with a signed-in user.
    pub fn with_user(user: AuthUser) -> Self {
        let provider = Self::new();
        provider.write_state(|state| state.current = Some(Some(user)));
        provider
    }

    /// Create a provider already initialized with nobody signed in.
    pub fn signed_out() -> Self {
        let provider = Self::new();
        provider.write_state(|state| state.current = Some(None));
        provider
    }

    /// Create a provider whose `subscribe` fails, as with a bad API key.
    pub fn failing(reason: impl Into<String>) -> Self {
        let provider = Self::new();
        let reason = reason.into();
        provider.write_state(|state| state.init_failure = Some(reason));
        provider
    }

    /// Make subsequent `sign_out` calls fail.
    pub fn fail_sign_out(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.write_state(|state| state.sign_out_failure = Some(reason));
    }

    /// Report the initial state (or any later state) to subscribers.
    pub fn set_user(&self, user: Option<AuthUser>) {
        self.write_state(|state| {
            state.current = Some(user.clone());
            broadcast(state, IdentityEvent::UserChanged(user));
        });
    }

    pub fn sign_in(&self, user: AuthUser) {
        info!(user_id = %user.id, "identity provider: sign-in");
        self.set_user(Some(user));
    }

    /// Drop the session as an expired token would.
    pub fn expire(&self) {
        info!("identity provider: session expired");
        self.set_user(None);
    }

    /// Push an initialization failure to every subscriber.
    pub fn report_failure(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.write_state(|state| broadcast(state, IdentityEvent::InitFailed(reason)));
    }

    /// Current user, if the provider has initialized and someone is signed in.
    pub fn current_user(&self) -> Option<AuthUser> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.current.clone().flatten())
    }

    pub fn subscriber_count(&self) -> usize {
        self.state
            .read()
            .map(|state| state.subscribers.len())
            .unwrap_or(0)
    }

    fn write_state(&self, f: impl FnOnce(&mut ProviderState)) {
        // A poisoned lock only happens after a panic inside one of these
        // closures; keep serving the last consistent state.
        let mut guard = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard);
    }
}

fn broadcast(state: &mut ProviderState, event: IdentityEvent) {
    state
        .subscribers
        .retain(|_, tx| tx.send(event.clone()).is_ok());
}

fn unsubscribe(state: &Weak<RwLock<ProviderState>>, id: u64) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let mut guard = match state.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if guard.subscribers.remove(&id).is_some() {
        debug!(subscription = id, "identity subscription released");
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    fn subscribe(&self) -> Result<Subscription, IdentityError> {
        let mut state = self.state.write().map_err(|_| IdentityError::LockError)?;
        if let Some(reason) = &state.init_failure {
            return Err(IdentityError::InitializationFailed(reason.clone()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(current) = &state.current {
            // Receiver is alive; cannot fail.
            let _ = tx.send(IdentityEvent::UserChanged(current.clone()));
        }

        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.insert(id, tx);
        debug!(subscription = id, "identity subscription opened");

        let weak = Arc::downgrade(&self.state);
        Ok(Subscription::new(id, rx, move |id| unsubscribe(&weak, id)))
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        {
            let state = self.state.read().map_err(|_| IdentityError::LockError)?;
            if let Some(reason) = &state.sign_out_failure {
                return Err(IdentityError::SignOutFailed(reason.clone()));
            }
        }
        info!("identity provider: sign-out");
        self.set_user(None);
        Ok(())
    }
}
