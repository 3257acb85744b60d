//! Async driver running a [`SessionGate`] against a live identity provider.

use crate::gate::SessionGate;
use crate::navigator::Navigator;
use opsgate_authz::AuthorizationCheck;
use opsgate_identity::{IdentityError, IdentityProvider, Subscription};
use opsgate_types::{RoutePaths, SessionSnapshot, UserId};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Aborts the wrapped task when dropped.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Handle to a running session.
///
/// Dropping the handle stops the driver and releases the identity
/// subscription.
pub struct SessionHandle {
    identity: Arc<dyn IdentityProvider>,
    snapshots: watch::Receiver<SessionSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Start a session. Must be called from within a tokio runtime.
    ///
    /// The identity subscription is opened before this returns, so no
    /// provider event pushed afterwards is missed.
    pub fn start(
        identity: Arc<dyn IdentityProvider>,
        authz: Arc<AuthorizationCheck>,
        navigator: Arc<dyn Navigator>,
        routes: RoutePaths,
    ) -> Self {
        let (tx, rx) = watch::channel(SessionSnapshot::default());
        let subscription = identity.subscribe();
        let task = tokio::spawn(run(subscription, authz, navigator, routes, tx));
        Self {
            identity,
            snapshots: rx,
            task: Some(task),
        }
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that always observes the most recent snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a snapshot satisfies `predicate`.
    ///
    /// Returns `None` if the driver stops first.
    pub async fn wait_until(
        &self,
        mut predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Option<SessionSnapshot> {
        let mut rx = self.snapshots.clone();
        rx.wait_for(|snapshot| predicate(snapshot))
            .await
            .ok()
            .map(|snapshot| SessionSnapshot::clone(&snapshot))
    }

    /// Sign the current user out through the identity provider.
    ///
    /// The provider's resulting null-user event drives navigation to login.
    pub async fn sign_out(&self) -> Result<(), IdentityError> {
        self.identity.sign_out().await.inspect_err(|err| {
            warn!(error = %err, "sign-out failed");
        })
    }

    /// Stop the driver and wait for it to release its subscription.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    subscription: Result<Subscription, IdentityError>,
    authz: Arc<AuthorizationCheck>,
    navigator: Arc<dyn Navigator>,
    routes: RoutePaths,
    tx: watch::Sender<SessionSnapshot>,
) {
    let mut gate = SessionGate::new();

    let mut subscription = match subscription {
        Ok(subscription) => subscription,
        Err(err) => {
            gate.fail(err.to_string());
            tx.send_replace(gate.snapshot());
            return;
        }
    };

    let mut pending_admin: Option<AbortOnDrop> = None;

    while let Some(event) = subscription.recv().await {
        let route = gate.apply(event);
        let mut snapshot = gate.snapshot();

        if route.is_some() || !snapshot.state.is_authenticated() {
            // The resolved identity changed; any admin resolution in flight
            // belongs to the previous one.
            drop(pending_admin.take());
        } else {
            // Same user again: keep the capability already resolved for it.
            snapshot.is_admin = tx.borrow().is_admin;
        }

        if let Some(route) = route {
            let path = routes.path(route);
            debug!(path, "navigating");
            navigator.replace(path);
        }
        tx.send_replace(snapshot);

        if route.is_some() {
            if let Some(user_id) = gate.state().user_id() {
                pending_admin = Some(AbortOnDrop(tokio::spawn(resolve_admin(
                    Arc::clone(&authz),
                    user_id.clone(),
                    gate.generation(),
                    tx.clone(),
                ))));
            }
        }
    }

    info!("identity provider closed; session driver stopped");
}

async fn resolve_admin(
    authz: Arc<AuthorizationCheck>,
    user_id: UserId,
    generation: u64,
    tx: watch::Sender<SessionSnapshot>,
) {
    let is_admin = authz.is_admin(&user_id).await;
    let applied = tx.send_if_modified(|snapshot| {
        let current = snapshot.generation >= generation
            && snapshot.state.user_id() == Some(&user_id);
        if !current || snapshot.is_admin == is_admin {
            return false;
        }
        snapshot.is_admin = is_admin;
        true
    });
    if applied {
        info!(user_id = %user_id, "admin capability granted");
    }
}
