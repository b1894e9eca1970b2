//! Token exchange tests with a mock HTTP server

use chrono::{Duration, Utc};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use etsymcp_auth::{EtsyTokenExchanger, TokenExchanger};
use etsymcp_core::{AuthConfig, AuthError};

async fn exchanger_for(server: &MockServer) -> EtsyTokenExchanger {
    let config = AuthConfig::new("client_123")
        .unwrap()
        .with_token_url(format!("{}/token", server.uri()));
    EtsyTokenExchanger::new(&config).unwrap()
}

#[tokio::test]
async fn exchange_posts_form_and_normalizes_expiry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("client_id=client_123"))
        .and(body_string_contains("code=auth_code_1"))
        .and(body_string_contains("code_verifier=verifier_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok_1",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let exchanger = exchanger_for(&server).await;
    let before = Utc::now();
    let token = exchanger
        .exchange_code("auth_code_1", "verifier_1")
        .await
        .unwrap();

    assert_eq!(token.access_token, "tok_1");
    assert_eq!(token.token_type, "Bearer");

    // expires_at is an absolute timestamp ~3600s out
    let expected = before + Duration::seconds(3600);
    let drift = (token.expires_at - expected).num_seconds().abs();
    assert!(drift < 10, "expiry drifted by {drift}s");
}

#[tokio::test]
async fn missing_expires_in_and_token_type_use_defaults() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok_2"
        })))
        .mount(&server)
        .await;

    let exchanger = exchanger_for(&server).await;
    let before = Utc::now();
    let token = exchanger.exchange_code("code", "verifier").await.unwrap();

    assert_eq!(token.token_type, "Bearer");
    let drift = (token.expires_at - (before + Duration::seconds(3600)))
        .num_seconds()
        .abs();
    assert!(drift < 10);
}

#[tokio::test]
async fn missing_access_token_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let exchanger = exchanger_for(&server).await;
    let err = exchanger.exchange_code("code", "verifier").await.unwrap_err();
    assert!(matches!(err, AuthError::MalformedResponse(_)));
}

#[tokio::test]
async fn upstream_rejection_carries_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .mount(&server)
        .await;

    let exchanger = exchanger_for(&server).await;
    let err = exchanger.exchange_code("code", "verifier").await.unwrap_err();

    match err {
        AuthError::ExchangeFailed { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("expected ExchangeFailed, got {other:?}"),
    }
}
