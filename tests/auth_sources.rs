//! HTTP-backed session lookup and auth settings against mock dashboard hosts.

use std::sync::Arc;
use std::time::Duration;

use tool_gateway::security::session::HttpSessionStore;
use tool_gateway::security::settings::HttpAuthSettings;
use tool_gateway::security::{AuthError, AuthGate, AuthSettingsSource, SessionStore, StaticAuthSettings};

mod common;

use common::{client, config_for, start_gateway_with_gate, MockBackend, MockResponse};

const ALICE_JSON: &str = r#"{"id":"u-42","email":"alice@example.com","role":"admin","name":"Alice"}"#;

fn session_store(port: u16) -> HttpSessionStore {
    HttpSessionStore::new(
        format!("http://127.0.0.1:{}/api/session", port),
        "session_token",
        Duration::from_secs(2),
    )
    .unwrap()
}

#[tokio::test]
async fn test_session_endpoint_200_yields_user() {
    let dashboard = MockBackend::start(MockResponse::json(ALICE_JSON)).await;

    let user = session_store(dashboard.port).lookup("tok-1").await.unwrap().unwrap();
    assert_eq!(user, common::alice());

    let seen = dashboard.last_request();
    assert_eq!(seen.target, "/api/session");
    assert_eq!(seen.header("cookie"), Some("session_token=tok-1"));
}

#[tokio::test]
async fn test_session_endpoint_denials_mean_no_session() {
    for status in [401, 403, 404] {
        let dashboard = MockBackend::start(MockResponse::new(status, Some("application/json"), "{}")).await;
        let result = session_store(dashboard.port).lookup("tok-1").await;
        assert!(matches!(result, Ok(None)), "status {} gave {:?}", status, result);
    }
}

#[tokio::test]
async fn test_session_endpoint_failure_is_an_error() {
    let dashboard = MockBackend::start(MockResponse::new(500, Some("text/plain"), "boom")).await;
    let result = session_store(dashboard.port).lookup("tok-1").await;
    assert!(matches!(result, Err(AuthError::UnexpectedStatus(500))));
}

#[tokio::test]
async fn test_failing_session_endpoint_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = MockBackend::start(MockResponse::new(502, None, "upstream down")).await;
    let backend = MockBackend::start(MockResponse::json("{}")).await;
    let config = config_for(&[("sheets", backend.port)], &dir);
    let gate = AuthGate::new(
        &config,
        Arc::new(session_store(dashboard.port)),
        Arc::new(StaticAuthSettings::from_config(&config)),
    );
    let gateway = start_gateway_with_gate(config, gate).await;

    let res = client()
        .get(gateway.url("/proxy/sheets/api/rows"))
        .header("Cookie", "session_token=tok-1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_settings_endpoint_overlays_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&[], &dir);
    let dashboard = MockBackend::start(MockResponse::json(r#"{"sheets": true, "retired-tool": true}"#)).await;
    let source = HttpAuthSettings::new(
        format!("http://127.0.0.1:{}/api/auth-settings", dashboard.port),
        StaticAuthSettings::from_config(&config),
        Duration::from_secs(2),
    )
    .unwrap();

    let settings = source.load().await;
    assert_eq!(settings.get("sheets"), Some(&true));
    assert_eq!(settings.get("inventory"), Some(&true));
    assert_eq!(settings.get("mer-report"), Some(&false));
    assert!(settings.get("retired-tool").is_none());
}

#[tokio::test]
async fn test_remote_own_login_flag_bypasses_gate() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = MockBackend::start(MockResponse::json(r#"{"sheets": true}"#)).await;
    let backend = MockBackend::start(MockResponse::json(r#"{"rows":[]}"#)).await;
    let config = config_for(&[("sheets", backend.port)], &dir);
    let settings = HttpAuthSettings::new(
        format!("http://127.0.0.1:{}/api/auth-settings", dashboard.port),
        StaticAuthSettings::from_config(&config),
        Duration::from_secs(2),
    )
    .unwrap();
    let gate = AuthGate::new(&config, Arc::new(session_store(dashboard.port)), Arc::new(settings));
    let gateway = start_gateway_with_gate(config, gate).await;

    let res = client().get(gateway.url("/proxy/sheets/api/rows")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(backend.last_request().header("x-proxy-authenticated").is_none());
}
