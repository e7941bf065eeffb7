//! Integration tests for the lingokit-auth crate.
//!
//! These tests drive [`CredentialManager`] against a scripted transport and
//! check the resolution order, the failure modes and the session cache.

use std::sync::Arc;

use lingokit_auth::{
    AuthError, CredentialManager, Credentials, FileSessionStore, SessionStore, TokenSource,
};
use lingokit_transport::testing::ScriptedTransport;
use lingokit_transport::{Method, Response, Transport, TransportError, TransportRequest};
use serde_json::json;

const BASE: &str = "https://lingo.test";
const PROFILE: &str = "https://lingo.test/users/amy";
const LOGIN: &str = "https://lingo.test/login";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Profile probe answers 200 only when `valid_token` is installed.
fn transport_accepting(valid_token: &'static str) -> Arc<ScriptedTransport> {
    init_tracing();
    let transport = Arc::new(ScriptedTransport::new());
    let probe_view = Arc::clone(&transport);
    transport.respond_with(Method::Get, PROFILE, move |_| {
        if probe_view.bearer_token().as_deref() == Some(valid_token) {
            Ok(Response::new(200, r#"{"username":"amy"}"#))
        } else {
            Ok(Response::new(401, r#"{"error":"unauthorized"}"#))
        }
    });
    transport
}

fn script_successful_login(transport: &ScriptedTransport, issued: &str) {
    transport.respond(
        Method::Post,
        LOGIN,
        Response::new(200, r#"{"response":"OK","username":"amy"}"#).with_header("jwt", issued),
    );
}

fn manager(transport: &Arc<ScriptedTransport>, credentials: Credentials) -> CredentialManager {
    CredentialManager::new(
        Arc::clone(transport) as Arc<dyn Transport>,
        BASE,
        credentials,
    )
}

// ═══════════════════════════════════════════════════════════════════════
//  Resolution order
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn valid_explicit_token_never_logs_in() {
    let transport = transport_accepting("good-token");
    script_successful_login(&transport, "fresh-token");

    let creds = Credentials::new("amy")
        .with_secret("pw")
        .with_token("good-token");
    let token = manager(&transport, creds).authenticate().await.unwrap();

    assert_eq!(token.as_str(), "good-token");
    assert_eq!(token.source(), TokenSource::Explicit);
    assert_eq!(transport.count(Method::Post, LOGIN), 0);
    assert_eq!(transport.count(Method::Get, PROFILE), 1);
    assert_eq!(transport.bearer_token().as_deref(), Some("good-token"));
}

#[tokio::test]
async fn probe_is_get_only_and_carries_candidate_token() {
    let transport = transport_accepting("good-token");
    let creds = Credentials::new("amy").with_token("good-token");
    manager(&transport, creds).authenticate().await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].request.method, Method::Get);
    assert_eq!(requests[0].bearer_token.as_deref(), Some("good-token"));
}

#[tokio::test]
async fn invalid_explicit_token_falls_back_to_login() {
    let transport = transport_accepting("never-matches");
    script_successful_login(&transport, "fresh-token");

    let creds = Credentials::new("amy")
        .with_secret("pw")
        .with_token("stale-token");
    let token = manager(&transport, creds).authenticate().await.unwrap();

    assert_eq!(token.as_str(), "fresh-token");
    assert_eq!(token.source(), TokenSource::Login);
    assert_eq!(transport.count(Method::Post, LOGIN), 1);
    assert_eq!(transport.bearer_token().as_deref(), Some("fresh-token"));
}

#[tokio::test]
async fn cached_session_is_used_when_valid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    FileSessionStore::new(&path).save("cached-token").unwrap();

    let transport = transport_accepting("cached-token");
    script_successful_login(&transport, "fresh-token");

    let creds = Credentials::new("amy")
        .with_secret("pw")
        .with_session_file(&path);
    let token = manager(&transport, creds).authenticate().await.unwrap();

    assert_eq!(token.as_str(), "cached-token");
    assert_eq!(token.source(), TokenSource::SessionFile);
    assert_eq!(transport.count(Method::Post, LOGIN), 0);
}

#[tokio::test]
async fn stale_cached_session_is_replaced_after_login() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let store = FileSessionStore::new(&path);
    store.save("stale-token").unwrap();

    let transport = transport_accepting("fresh-token");
    script_successful_login(&transport, "fresh-token");

    let creds = Credentials::new("amy")
        .with_secret("pw")
        .with_session_file(&path);
    let token = manager(&transport, creds).authenticate().await.unwrap();

    assert_eq!(token.source(), TokenSource::Login);
    assert_eq!(store.load().unwrap().as_deref(), Some("fresh-token"));
}

#[tokio::test]
async fn corrupt_session_file_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{{{ not json").unwrap();

    let transport = transport_accepting("fresh-token");
    script_successful_login(&transport, "fresh-token");

    let creds = Credentials::new("amy")
        .with_secret("pw")
        .with_session_file(&path);
    let token = manager(&transport, creds).authenticate().await.unwrap();
    assert_eq!(token.as_str(), "fresh-token");
}

#[tokio::test]
async fn login_persists_token_to_session_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache/session.json");

    let transport = transport_accepting("fresh-token");
    script_successful_login(&transport, "fresh-token");

    let creds = Credentials::new("amy")
        .with_secret("pw")
        .with_session_file(&path);
    manager(&transport, creds).authenticate().await.unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value, json!({"jwt_session": "fresh-token"}));
}

#[tokio::test]
async fn unwritable_session_file_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the file should be makes the write fail.
    let path = dir.path().join("occupied");
    std::fs::create_dir(&path).unwrap();

    let transport = transport_accepting("fresh-token");
    script_successful_login(&transport, "fresh-token");

    let creds = Credentials::new("amy")
        .with_secret("pw")
        .with_session_file(&path);
    let token = manager(&transport, creds).authenticate().await.unwrap();
    assert_eq!(token.as_str(), "fresh-token");
}

#[tokio::test]
async fn login_reads_token_from_body_when_header_missing() {
    let transport = transport_accepting("body-token");
    transport.respond(
        Method::Post,
        LOGIN,
        Response::new(200, r#"{"response":"OK","jwt":"body-token"}"#),
    );

    let creds = Credentials::new("amy").with_secret("pw");
    let token = manager(&transport, creds).authenticate().await.unwrap();
    assert_eq!(token.as_str(), "body-token");
}

#[tokio::test]
async fn login_sends_identifier_and_secret() {
    let transport = transport_accepting("fresh-token");
    script_successful_login(&transport, "fresh-token");

    let creds = Credentials::new("amy").with_secret("pw");
    manager(&transport, creds).authenticate().await.unwrap();

    let login = transport
        .requests()
        .into_iter()
        .find(|r| r.request.url == LOGIN)
        .unwrap();
    assert_eq!(login.request.method, Method::Post);
    assert_eq!(
        login.request.json_body,
        Some(json!({"login": "amy", "password": "pw"}))
    );
}

// ═══════════════════════════════════════════════════════════════════════
//  Failure modes
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn failure_payload_is_invalid_credentials() {
    let transport = transport_accepting("unused");
    transport.respond(
        Method::Post,
        LOGIN,
        Response::new(200, r#"{"failure":"invalid_password","message":"nope"}"#),
    );

    let creds = Credentials::new("amy").with_secret("wrong");
    let err = manager(&transport, creds).authenticate().await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials { ref identifier } if identifier == "amy"));
    assert!(transport.bearer_token().is_none());
}

#[tokio::test]
async fn server_error_on_login_is_a_transport_error() {
    let transport = transport_accepting("unused");
    transport.respond(Method::Post, LOGIN, Response::new(503, "Service Unavailable"));

    let creds = Credentials::new("amy").with_secret("pw");
    let err = manager(&transport, creds).authenticate().await.unwrap_err();

    match err {
        AuthError::Transport(TransportError::Status { status, url }) => {
            assert_eq!(status, 503);
            assert_eq!(url, LOGIN);
        }
        other => panic!("expected a transport status error, got {other:?}"),
    }
    assert!(transport.bearer_token().is_none());
}

#[tokio::test]
async fn failure_payload_wins_over_status() {
    let transport = transport_accepting("unused");
    transport.respond(
        Method::Post,
        LOGIN,
        Response::new(403, r#"{"failure":"invalid_password"}"#),
    );

    let creds = Credentials::new("amy").with_secret("wrong");
    let err = manager(&transport, creds).authenticate().await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials { .. }));
}

#[tokio::test]
async fn captcha_on_login_is_terminal() {
    let transport = transport_accepting("unused");
    transport.captcha(Method::Post, LOGIN);

    let creds = Credentials::new("amy").with_secret("pw");
    let err = manager(&transport, creds).authenticate().await.unwrap_err();

    match err {
        AuthError::CaptchaRequired { url, user_agent } => {
            assert_eq!(url, LOGIN);
            assert_eq!(user_agent, transport.user_agent());
        }
        other => panic!("expected CaptchaRequired, got {other:?}"),
    }
    assert_eq!(transport.count(Method::Post, LOGIN), 1);
}

#[tokio::test]
async fn captcha_on_probe_is_terminal() {
    init_tracing();
    let transport = Arc::new(ScriptedTransport::new());
    transport.captcha(Method::Get, PROFILE);
    script_successful_login(&transport, "fresh-token");

    let creds = Credentials::new("amy")
        .with_secret("pw")
        .with_token("some-token");
    let err = manager(&transport, creds).authenticate().await.unwrap_err();

    assert!(matches!(err, AuthError::CaptchaRequired { .. }));
    assert_eq!(transport.count(Method::Post, LOGIN), 0);
}

#[tokio::test]
async fn no_source_is_missing_credential_source() {
    let transport = transport_accepting("unused");
    let err = manager(&transport, Credentials::new("amy"))
        .authenticate()
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::MissingCredentialSource { .. }));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn rejected_token_without_secret_is_missing_source() {
    let transport = transport_accepting("something-else");
    let creds = Credentials::new("amy").with_token("stale-token");
    let err = manager(&transport, creds).authenticate().await.unwrap_err();
    assert!(matches!(err, AuthError::MissingCredentialSource { .. }));
}

// ═══════════════════════════════════════════════════════════════════════
//  Token lifetime
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn token_is_stable_across_calls() {
    let transport = transport_accepting("fresh-token");
    script_successful_login(&transport, "fresh-token");

    let mgr = manager(&transport, Credentials::new("amy").with_secret("pw"));
    let first = mgr.authenticate().await.unwrap();
    let second = mgr.authenticate().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(transport.count(Method::Post, LOGIN), 1);
    assert_eq!(mgr.current(), Some(first));
}

#[tokio::test]
async fn refresh_replaces_token() {
    let transport = transport_accepting("good-token");
    script_successful_login(&transport, "refreshed-token");

    let mgr = manager(
        &transport,
        Credentials::new("amy").with_secret("pw").with_token("good-token"),
    );
    let first = mgr.authenticate().await.unwrap();
    assert_eq!(first.source(), TokenSource::Explicit);

    let refreshed = mgr.refresh().await.unwrap();
    assert_eq!(refreshed.as_str(), "refreshed-token");
    assert_eq!(refreshed.source(), TokenSource::Login);
    assert_eq!(transport.bearer_token().as_deref(), Some("refreshed-token"));
}

#[tokio::test]
async fn refresh_drops_the_cached_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let store = FileSessionStore::new(&path);
    store.save("cached-token").unwrap();

    let transport = transport_accepting("cached-token");
    transport.respond(Method::Post, LOGIN, Response::new(503, ""));

    let mgr = manager(
        &transport,
        Credentials::new("amy").with_secret("pw").with_session_file(&path),
    );
    assert_eq!(mgr.authenticate().await.unwrap().source(), TokenSource::SessionFile);

    assert!(matches!(mgr.refresh().await, Err(AuthError::Transport(_))));
    assert_eq!(store.load().unwrap(), None);
    assert!(mgr.current().is_none());
    assert!(transport.bearer_token().is_none());
}

#[tokio::test]
async fn subsequent_requests_carry_bearer_token() {
    let transport = transport_accepting("fresh-token");
    script_successful_login(&transport, "fresh-token");
    transport.respond(
        Method::Get,
        "https://lingo.test/vocabulary/overview",
        Response::new(200, "{}"),
    );

    manager(&transport, Credentials::new("amy").with_secret("pw"))
        .authenticate()
        .await
        .unwrap();

    transport
        .request(TransportRequest::get("https://lingo.test/vocabulary/overview"))
        .await
        .unwrap();

    let last = transport.requests().pop().unwrap();
    assert_eq!(last.bearer_token.as_deref(), Some("fresh-token"));
}
