//! Session orchestrator state-machine tests.
//!
//! Each test drives the real callback listener on its own loopback port; the
//! browser double plays the user's role by firing the redirect, and the
//! exchanger double counts how often a code is actually exchanged.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use pretty_assertions::assert_eq;

use etsymcp_auth::{BrowserOpener, CallbackListener, SessionOrchestrator};
use etsymcp_core::{AuthConfig, AuthError, SessionStore, TokenRecord};

use tests::mocks::{
    query_param, FailingSessionStore, MemorySessionStore, MockExchanger, NoopBrowser,
    ScriptedBrowser,
};

fn scopes() -> Vec<String> {
    vec!["shops_r".to_string(), "listings_r".to_string()]
}

fn orchestrator_on(
    port: u16,
    exchanger: Arc<MockExchanger>,
    store: Arc<dyn SessionStore>,
    browser: Arc<dyn BrowserOpener>,
) -> SessionOrchestrator {
    let config = AuthConfig::new("test_key")
        .unwrap()
        .with_redirect_uri(format!("http://127.0.0.1:{port}/callback"))
        .with_auth_wait(Duration::from_secs(10));
    SessionOrchestrator::new(config, exchanger, store, browser)
}

/// Browser double that approves the request: redirects back with a code and
/// the state the orchestrator generated for this attempt.
fn approving_browser(port: u16) -> Arc<ScriptedBrowser> {
    Arc::new(ScriptedBrowser::new(move |auth_url| {
        let state = query_param(auth_url, "state").expect("state in auth URL");
        format!("http://127.0.0.1:{port}/callback?code=abc123&state={state}")
    }))
}

#[tokio::test]
async fn connect_success_scenario() {
    let port = 18931;
    let exchanger = Arc::new(MockExchanger::succeeding());
    let store = Arc::new(MemorySessionStore::new());
    let orchestrator = orchestrator_on(
        port,
        exchanger.clone(),
        store.clone(),
        approving_browser(port),
    );

    let before = Utc::now();
    let token = orchestrator.connect(&scopes()).await.unwrap();

    assert_eq!(token.access_token, "tok_1");
    assert_eq!(exchanger.call_count(), 1);
    let drift = (token.expires_at - (before + chrono::Duration::seconds(3600)))
        .num_seconds()
        .abs();
    assert!(drift < 10);

    let status = orchestrator.status().await;
    assert!(status.connected);
    assert_eq!(status.expires_at, Some(token.expires_at));

    // Persisted as well as held in memory
    assert_eq!(store.peek().unwrap().access_token, "tok_1");
}

#[tokio::test]
async fn state_mismatch_never_exchanges_the_code() {
    let port = 18932;
    let exchanger = Arc::new(MockExchanger::succeeding());
    let store = Arc::new(MemorySessionStore::new());
    let forging_browser = Arc::new(ScriptedBrowser::new(move |_auth_url| {
        format!("http://127.0.0.1:{port}/callback?code=abc123&state=forged_state")
    }));
    let orchestrator = orchestrator_on(port, exchanger.clone(), store.clone(), forging_browser);

    let err = orchestrator.connect(&scopes()).await.unwrap_err();
    assert!(matches!(err, AuthError::CsrfMismatch));
    assert_eq!(exchanger.call_count(), 0);
    assert!(!orchestrator.status().await.connected);
}

#[tokio::test]
async fn provider_error_surfaces_as_denied() {
    let port = 18933;
    let exchanger = Arc::new(MockExchanger::succeeding());
    let store = Arc::new(MemorySessionStore::new());
    let denying_browser = Arc::new(ScriptedBrowser::new(move |_auth_url| {
        format!("http://127.0.0.1:{port}/callback?error=access_denied")
    }));
    let orchestrator = orchestrator_on(port, exchanger.clone(), store.clone(), denying_browser);

    let err = orchestrator.connect(&scopes()).await.unwrap_err();
    match err {
        AuthError::AuthorizationDenied(message) => assert_eq!(message, "access_denied"),
        other => panic!("expected AuthorizationDenied, got {other:?}"),
    }
    assert_eq!(exchanger.call_count(), 0);
}

#[tokio::test]
async fn callback_without_code_is_missing_code() {
    let port = 18934;
    let exchanger = Arc::new(MockExchanger::succeeding());
    let store = Arc::new(MemorySessionStore::new());
    let empty_browser = Arc::new(ScriptedBrowser::new(move |_auth_url| {
        format!("http://127.0.0.1:{port}/callback")
    }));
    let orchestrator = orchestrator_on(port, exchanger.clone(), store.clone(), empty_browser);

    let err = orchestrator.connect(&scopes()).await.unwrap_err();
    assert!(matches!(err, AuthError::MissingCode));
    assert_eq!(exchanger.call_count(), 0);
}

#[tokio::test]
async fn timeout_returns_promptly_and_releases_the_port() {
    let port = 18935;
    let exchanger = Arc::new(MockExchanger::succeeding());
    let store = Arc::new(MemorySessionStore::new());
    let config = AuthConfig::new("test_key")
        .unwrap()
        .with_redirect_uri(format!("http://127.0.0.1:{port}/callback"))
        .with_auth_wait(Duration::from_secs(1));
    let orchestrator =
        SessionOrchestrator::new(config, exchanger.clone(), store, Arc::new(NoopBrowser));

    let started = Instant::now();
    let err = orchestrator.connect(&scopes()).await.unwrap_err();
    assert!(matches!(err, AuthError::Timeout(_)));
    assert!(started.elapsed() < Duration::from_secs(5), "bounded overhead");

    // Listener socket was released on the way out
    let relisten = CallbackListener::start(&format!("http://127.0.0.1:{port}/callback"))
        .await
        .expect("port released after timeout");
    relisten.stop().await;
}

#[tokio::test]
async fn exchange_failure_leaves_session_idle() {
    let port = 18936;
    let exchanger = Arc::new(MockExchanger::failing());
    let store = Arc::new(MemorySessionStore::new());
    let orchestrator = orchestrator_on(
        port,
        exchanger.clone(),
        store.clone(),
        approving_browser(port),
    );

    let err = orchestrator.connect(&scopes()).await.unwrap_err();
    assert!(matches!(err, AuthError::ExchangeFailed { .. }));
    assert_eq!(exchanger.call_count(), 1);
    assert!(!orchestrator.status().await.connected);
    assert!(store.peek().is_none());
}

#[tokio::test]
async fn disconnect_clears_memory_and_store() {
    let port = 18937;
    let exchanger = Arc::new(MockExchanger::succeeding());
    let store = Arc::new(MemorySessionStore::new());
    let orchestrator = orchestrator_on(
        port,
        exchanger.clone(),
        store.clone(),
        approving_browser(port),
    );

    orchestrator.connect(&scopes()).await.unwrap();
    assert!(orchestrator.status().await.connected);

    orchestrator.disconnect().await.unwrap();
    assert!(!orchestrator.status().await.connected);
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn disconnect_while_idle_is_a_reported_noop() {
    let exchanger = Arc::new(MockExchanger::succeeding());
    let store = Arc::new(MemorySessionStore::new());
    let orchestrator = orchestrator_on(18938, exchanger, store, Arc::new(NoopBrowser));

    let err = orchestrator.disconnect().await.unwrap_err();
    assert!(matches!(err, AuthError::NotConnected));
}

#[tokio::test]
async fn restore_picks_up_a_live_stored_session() {
    let token = TokenRecord::new("tok_live", "Bearer", Utc::now() + chrono::Duration::hours(1));
    let store = Arc::new(MemorySessionStore::seeded(token.clone()));
    let orchestrator = orchestrator_on(
        18939,
        Arc::new(MockExchanger::succeeding()),
        store,
        Arc::new(NoopBrowser),
    );

    assert!(orchestrator.restore().await);
    let status = orchestrator.status().await;
    assert!(status.connected);
    assert_eq!(status.expires_at, Some(token.expires_at));
    assert_eq!(orchestrator.access_token().await.as_deref(), Some("tok_live"));
}

#[tokio::test]
async fn concurrent_connects_share_the_port_without_a_bind_race() {
    let port = 18941;
    let exchanger = Arc::new(MockExchanger::succeeding());
    let store = Arc::new(MemorySessionStore::new());
    let orchestrator = orchestrator_on(port, exchanger.clone(), store, approving_browser(port));

    // Both attempts want the same loopback port; the second must wait for the
    // first listener to be torn down rather than fail to bind.
    let scopes = scopes();
    let (first, second) = tokio::join!(
        orchestrator.connect(&scopes),
        orchestrator.connect(&scopes)
    );

    assert!(first.is_ok(), "first connect failed: {:?}", first.err());
    assert!(second.is_ok(), "second connect failed: {:?}", second.err());
    assert_eq!(exchanger.call_count(), 2);
    assert!(orchestrator.status().await.connected);
}

#[tokio::test]
async fn save_failure_degrades_to_memory_only_session() {
    let port = 18942;
    let exchanger = Arc::new(MockExchanger::succeeding());
    let orchestrator = orchestrator_on(
        port,
        exchanger,
        Arc::new(FailingSessionStore),
        approving_browser(port),
    );

    // Persistence is unavailable, but the connect itself still succeeds and
    // the session lives in memory.
    let token = orchestrator.connect(&scopes()).await.unwrap();
    assert_eq!(token.access_token, "tok_1");
    assert!(orchestrator.status().await.connected);

    // Clearing the stored copy fails too; disconnect still clears memory.
    orchestrator.disconnect().await.unwrap();
    assert!(!orchestrator.status().await.connected);
}

#[tokio::test]
async fn restore_treats_a_failing_store_as_no_session() {
    let orchestrator = orchestrator_on(
        18943,
        Arc::new(MockExchanger::succeeding()),
        Arc::new(FailingSessionStore),
        Arc::new(NoopBrowser),
    );

    assert!(!orchestrator.restore().await);
    assert!(!orchestrator.status().await.connected);
}

#[tokio::test]
async fn restore_ignores_an_expired_stored_session() {
    let token = TokenRecord::new("tok_stale", "Bearer", Utc::now() - chrono::Duration::hours(1));
    let store = Arc::new(MemorySessionStore::seeded(token));
    let orchestrator = orchestrator_on(
        18940,
        Arc::new(MockExchanger::succeeding()),
        store.clone(),
        Arc::new(NoopBrowser),
    );

    assert!(!orchestrator.restore().await);
    assert!(!orchestrator.status().await.connected);
    // Lazy expiry purged the slot
    assert!(store.peek().is_none());
}
