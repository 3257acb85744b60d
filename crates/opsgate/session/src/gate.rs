use opsgate_identity::IdentityEvent;
use opsgate_types::{Route, SessionSnapshot, SessionState, UserId};
use tracing::{debug, info, warn};

/// Resolved identity the gate last navigated for.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Resolved {
    SignedIn(UserId),
    SignedOut,
}

/// Session state machine.
///
/// Starts in `Loading` and blocks navigation until the identity provider
/// delivers a state. Navigation is issued at most once per distinct resolved
/// state, so repeated identical events are no-ops.
#[derive(Debug, Default)]
pub struct SessionGate {
    state: SessionState,
    last_resolved: Option<Resolved>,
    generation: u64,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Number of events applied so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Snapshot with admin capability not yet resolved.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state.clone(),
            is_admin: false,
            generation: self.generation,
        }
    }

    /// Apply one identity event and return the navigation to issue, if any.
    pub fn apply(&mut self, event: IdentityEvent) -> Option<Route> {
        self.generation += 1;
        match event {
            IdentityEvent::UserChanged(Some(user)) => {
                self.state = SessionState::Authenticated {
                    user_id: user.id.clone(),
                };
                self.resolve(Resolved::SignedIn(user.id), Route::Dashboard)
            }
            IdentityEvent::UserChanged(None) => {
                self.state = SessionState::Unauthenticated;
                self.resolve(Resolved::SignedOut, Route::Login)
            }
            IdentityEvent::InitFailed(reason) => {
                self.fail(reason);
                None
            }
        }
    }

    /// Record an identity provider initialization failure.
    ///
    /// This is never treated as signed-out. The error surface replaces the
    /// current page, so the next valid state navigates again.
    pub fn fail(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(reason = %reason, "identity provider unavailable");
        self.state = SessionState::Failed { reason };
        self.last_resolved = None;
    }

    fn resolve(&mut self, resolved: Resolved, route: Route) -> Option<Route> {
        if self.last_resolved.as_ref() == Some(&resolved) {
            debug!(?route, "session state unchanged; skipping navigation");
            return None;
        }
        info!(?route, generation = self.generation, "session resolved");
        self.last_resolved = Some(resolved);
        Some(route)
    }
}
