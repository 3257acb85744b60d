//! End-to-end session flow against the in-memory adapters.

use chrono::Utc;
use opsgate_authz::{AdminAllowList, AuthorizationCheck};
use opsgate_identity::InMemoryIdentityProvider;
use opsgate_roles::InMemoryRoleStore;
use opsgate_session::shell::{ShellView, Surface};
use opsgate_session::{RecordingNavigator, SessionHandle};
use opsgate_types::{AuthUser, Role, RoleRecord, RoutePaths, SessionSnapshot, SessionState, UserId};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    provider: InMemoryIdentityProvider,
    store: Arc<InMemoryRoleStore>,
    navigator: Arc<RecordingNavigator>,
    session: SessionHandle,
}

fn start(provider: InMemoryIdentityProvider, allow_list: &[&str]) -> Harness {
    start_with_store(provider, allow_list, Arc::new(InMemoryRoleStore::new()))
}

fn start_with_store(
    provider: InMemoryIdentityProvider,
    allow_list: &[&str],
    store: Arc<InMemoryRoleStore>,
) -> Harness {
    let navigator = Arc::new(RecordingNavigator::new());
    let authz = Arc::new(AuthorizationCheck::new(
        AdminAllowList::new(allow_list.iter().copied()),
        store.clone(),
    ));
    let session = SessionHandle::start(
        Arc::new(provider.clone()),
        authz,
        navigator.clone(),
        RoutePaths::default(),
    );
    Harness {
        provider,
        store,
        navigator,
        session,
    }
}

async fn wait(
    session: &SessionHandle,
    predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    tokio::time::timeout(Duration::from_secs(2), session.wait_until(predicate))
        .await
        .expect("timed out waiting for session")
        .expect("session driver stopped")
}

fn admin_record(id: &str) -> RoleRecord {
    RoleRecord {
        user_id: UserId::new(id),
        role: Role::Admin,
        email: format!("{id}@example.com"),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_stays_loading_until_provider_reports() {
    let h = start(InMemoryIdentityProvider::new(), &[]);
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(h.session.snapshot().state.is_loading());
    assert_eq!(ShellView::for_snapshot(&h.session.snapshot()), ShellView::Loading);
    assert!(h.navigator.calls().is_empty());

    h.provider.set_user(None);
    let snapshot = wait(&h.session, |s| s.generation == 1).await;
    assert_eq!(snapshot.state, SessionState::Unauthenticated);
    assert_eq!(h.navigator.calls(), vec!["/login"]);
}

#[tokio::test]
async fn test_null_then_user_navigates_twice_ending_on_dashboard() {
    let h = start(InMemoryIdentityProvider::new(), &[]);

    h.provider.set_user(None);
    h.provider.sign_in(AuthUser::new("U1"));

    let snapshot = wait(&h.session, |s| s.generation == 2).await;
    assert!(snapshot.state.is_authenticated());
    assert_eq!(h.navigator.calls(), vec!["/login", "/dashboard"]);
}

#[tokio::test]
async fn test_repeated_sign_in_navigates_once() {
    let h = start(InMemoryIdentityProvider::with_user(AuthUser::new("U1")), &[]);
    wait(&h.session, |s| s.generation == 1).await;

    h.provider.sign_in(AuthUser::new("U1"));
    h.provider.sign_in(AuthUser::new("U1"));
    wait(&h.session, |s| s.generation == 3).await;

    assert_eq!(h.navigator.calls(), vec!["/dashboard"]);
}

#[tokio::test]
async fn test_repeated_sign_in_keeps_admin_capability() {
    let store = Arc::new(InMemoryRoleStore::new());
    store.insert(admin_record("U2")).unwrap();
    store.set_latency(Duration::from_millis(100));
    let h = start_with_store(InMemoryIdentityProvider::new(), &[], store);

    h.provider.sign_in(AuthUser::new("U2"));
    wait(&h.session, |s| s.is_admin).await;

    h.provider.sign_in(AuthUser::new("U2"));
    let snapshot = wait(&h.session, |s| s.generation == 2).await;
    assert!(snapshot.is_admin);
    assert_eq!(h.navigator.calls(), vec!["/dashboard"]);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(h.session.snapshot().is_admin);
    assert_eq!(h.store.lookup_count(), 1);
}

#[tokio::test]
async fn test_repeat_while_resolving_still_grants_admin() {
    let store = Arc::new(InMemoryRoleStore::new());
    store.insert(admin_record("U2")).unwrap();
    store.set_latency(Duration::from_millis(100));
    let h = start_with_store(InMemoryIdentityProvider::new(), &[], store);

    h.provider.sign_in(AuthUser::new("U2"));
    h.provider.sign_in(AuthUser::new("U2"));

    let snapshot = wait(&h.session, |s| s.is_admin).await;
    assert_eq!(snapshot.generation, 2);
    assert_eq!(h.store.lookup_count(), 1);
}

#[tokio::test]
async fn test_allow_listed_user_gets_admin_shell() {
    let h = start(InMemoryIdentityProvider::with_user(AuthUser::new("U1")), &["U1"]);

    let snapshot = wait(&h.session, |s| s.is_admin).await;
    match ShellView::for_snapshot(&snapshot) {
        ShellView::Dashboard { context, surfaces } => {
            assert!(context.is_admin);
            assert!(surfaces.contains(&Surface::FeatureFlags));
        }
        other => panic!("unexpected view: {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_role_lookup_keeps_standard_shell() {
    let store = Arc::new(InMemoryRoleStore::new());
    store.insert(admin_record("U3")).unwrap();
    store.fail_reads("network error");
    let h = start_with_store(
        InMemoryIdentityProvider::with_user(AuthUser::new("U3")),
        &[],
        store,
    );

    wait(&h.session, |s| s.generation == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(h.store.lookup_count() >= 1);
    assert!(!h.session.snapshot().is_admin);
}

#[tokio::test]
async fn test_init_failure_is_surfaced_not_logged_out() {
    let h = start(InMemoryIdentityProvider::failing("invalid api key"), &[]);

    let snapshot = wait(&h.session, |s| s.state.is_failed()).await;
    assert!(!snapshot.state.is_loading());
    assert_ne!(snapshot.state, SessionState::Unauthenticated);
    assert!(matches!(
        ShellView::for_snapshot(&snapshot),
        ShellView::Error { .. }
    ));
    assert!(h.navigator.calls().is_empty());
}

#[tokio::test]
async fn test_reported_init_failure_then_recovery() {
    let h = start(InMemoryIdentityProvider::new(), &[]);

    h.provider.report_failure("auth domain unreachable");
    wait(&h.session, |s| s.state.is_failed()).await;
    assert!(h.navigator.calls().is_empty());

    h.provider.sign_in(AuthUser::new("U1"));
    wait(&h.session, |s| s.state.is_authenticated()).await;
    assert_eq!(h.navigator.calls(), vec!["/dashboard"]);
}

#[tokio::test]
async fn test_sign_out_while_on_dashboard_returns_to_login() {
    let h = start(InMemoryIdentityProvider::with_user(AuthUser::new("U1")), &[]);
    wait(&h.session, |s| s.state.is_authenticated()).await;

    h.session.sign_out().await.unwrap();
    let snapshot = wait(&h.session, |s| s.generation == 2).await;

    assert_eq!(snapshot.state, SessionState::Unauthenticated);
    assert_eq!(h.navigator.last().as_deref(), Some("/login"));
}

#[tokio::test]
async fn test_token_expiry_returns_to_login() {
    let h = start(InMemoryIdentityProvider::with_user(AuthUser::new("U1")), &[]);
    wait(&h.session, |s| s.generation == 1).await;

    h.provider.expire();
    wait(&h.session, |s| s.generation == 2).await;
    assert_eq!(h.navigator.calls(), vec!["/dashboard", "/login"]);
}

#[tokio::test]
async fn test_stale_admin_resolution_is_discarded() {
    let store = Arc::new(InMemoryRoleStore::new());
    store.insert(admin_record("U2")).unwrap();
    store.set_latency(Duration::from_millis(100));
    let h = start_with_store(InMemoryIdentityProvider::new(), &[], store);

    h.provider.sign_in(AuthUser::new("U2"));
    h.provider.set_user(None);
    wait(&h.session, |s| s.generation == 2).await;

    tokio::time::sleep(Duration::from_millis(250)).await;
    let snapshot = h.session.snapshot();
    assert_eq!(snapshot.state, SessionState::Unauthenticated);
    assert!(!snapshot.is_admin);
}

#[tokio::test]
async fn test_shutdown_releases_subscription() {
    let h = start(InMemoryIdentityProvider::signed_out(), &[]);
    wait(&h.session, |s| s.generation == 1).await;
    assert_eq!(h.provider.subscriber_count(), 1);

    h.session.shutdown().await;
    assert_eq!(h.provider.subscriber_count(), 0);
}

#[tokio::test]
async fn test_dropping_handle_releases_subscription() {
    let h = start(InMemoryIdentityProvider::signed_out(), &[]);
    wait(&h.session, |s| s.generation == 1).await;
    assert_eq!(h.provider.subscriber_count(), 1);

    drop(h.session);
    tokio::time::timeout(Duration::from_secs(2), async {
        while h.provider.subscriber_count() > 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("subscription still open after dropping the handle");
}
