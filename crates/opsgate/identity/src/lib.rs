//! OpsGate Identity - identity provider adapter
//!
//! Wraps the external authentication service behind [`IdentityProvider`].
//! Consumers receive user-state changes through a [`Subscription`] that
//! unsubscribes itself when dropped, so a torn-down session never leaves a
//! live callback behind.

#![deny(unsafe_code)]

mod memory;

pub use memory::InMemoryIdentityProvider;

use async_trait::async_trait;
use opsgate_types::AuthUser;
use thiserror::Error;
use tokio::sync::mpsc;

/// Event pushed by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentityEvent {
    /// Current user changed; `None` means signed out.
    UserChanged(Option<AuthUser>),
    /// The provider could not establish a session at all.
    InitFailed(String),
}

/// Adapter over an external authentication service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Subscribe to user-state changes.
    ///
    /// Fails when the provider itself cannot be initialized.
    fn subscribe(&self) -> Result<Subscription, IdentityError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), IdentityError>;
}

/// Live subscription to identity events.
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<IdentityEvent>,
    on_drop: Option<Box<dyn FnOnce(u64) + Send + Sync>>,
}

impl Subscription {
    /// Build a subscription from a receiver and an unsubscribe hook.
    pub fn new(
        id: u64,
        rx: mpsc::UnboundedReceiver<IdentityEvent>,
        on_drop: impl FnOnce(u64) + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            rx,
            on_drop: Some(Box::new(on_drop)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next event. Returns `None` once the provider is gone.
    pub async fn recv(&mut self) -> Option<IdentityEvent> {
        self.rx.recv().await
    }

    /// Explicitly detach from the provider.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        self.rx.close();
        if let Some(hook) = self.on_drop.take() {
            hook(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Identity-related errors
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity provider failed to initialize: {0}")]
    InitializationFailed(String),

    #[error("Sign-out failed: {0}")]
    SignOutFailed(String),

    #[error("Identity provider closed")]
    Closed,

    #[error("Lock error")]
    LockError,
}
