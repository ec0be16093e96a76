// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token lifecycle integration tests.
//!
//! Exercises the credential manager against a mocked OAuth endpoint:
//! 1. Tokens valid past the margin are handed out without a refresh
//! 2. Expiring tokens are refreshed and the rotation persisted
//! 3. Concurrent callers collapse to one upstream refresh
//! 4. A failed refresh leaves the stored credential untouched

mod common;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use timeline_relay::error::AppError;
use timeline_relay::models::Credential;
use timeline_relay::services::{TimelineClient, TokenManager};
use timeline_relay::store::{MemoryStore, Store};

fn token_manager(server: &MockServer, store: Arc<dyn Store>) -> TokenManager {
    let http = reqwest::Client::new();
    TokenManager::new(TimelineClient::new(http, server.uri()), store)
}

#[tokio::test]
async fn test_valid_token_returned_without_refresh() {
    // No mocks mounted: any upstream call would fail the test.
    let server = MockServer::start().await;
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    common::seed_valid_credential(store.as_ref(), "token-abc").await;

    let tokens = token_manager(&server, store);
    let token = tokens.ensure_valid_token().await.unwrap();
    assert_eq!(token, "token-abc");
}

#[tokio::test]
async fn test_expiring_token_refreshed_and_persisted() {
    let server = MockServer::start().await;
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    common::seed_expiring_credential(store.as_ref(), "nearly-dead").await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "refresh_token": "rotated-refresh",
            "expires_in": 7200
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = token_manager(&server, store.clone());
    let token = tokens.ensure_valid_token().await.unwrap();
    assert_eq!(token, "fresh-token");

    let credential = store.get_credential().await.unwrap().unwrap();
    assert_eq!(credential.access_token.as_deref(), Some("fresh-token"));
    assert_eq!(credential.refresh_token.as_deref(), Some("rotated-refresh"));
    assert!(credential.expires_at.unwrap() > Utc::now() + Duration::minutes(60));
}

#[tokio::test]
async fn test_concurrent_refreshes_collapse_to_one_upstream_call() {
    let server = MockServer::start().await;
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    common::seed_expiring_credential(store.as_ref(), "nearly-dead").await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "access_token": "fresh-token",
                    "refresh_token": "rotated-refresh",
                    "expires_in": 7200
                }))
                .set_delay(StdDuration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tokens = token_manager(&server, store);
    let (a, b, c) = tokio::join!(
        tokens.ensure_valid_token(),
        tokens.ensure_valid_token(),
        tokens.ensure_valid_token(),
    );

    assert_eq!(a.unwrap(), "fresh-token");
    assert_eq!(b.unwrap(), "fresh-token");
    assert_eq!(c.unwrap(), "fresh-token");
    // expect(1) on the mock verifies the single upstream call on drop.
}

#[tokio::test]
async fn test_failed_refresh_preserves_stored_credential() {
    let server = MockServer::start().await;
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    common::seed_expiring_credential(store.as_ref(), "old-token").await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Refresh token expired"
        })))
        .mount(&server)
        .await;

    let tokens = token_manager(&server, store.clone());
    let err = tokens.ensure_valid_token().await.unwrap_err();
    assert!(matches!(err, AppError::TokenRefresh(_)));
    assert!(err.to_string().contains("Refresh token expired"));

    // The stored credential is exactly what we seeded.
    let credential = store.get_credential().await.unwrap().unwrap();
    assert_eq!(credential.access_token.as_deref(), Some("old-token"));
    assert_eq!(credential.refresh_token.as_deref(), Some("refresh-initial"));
}

#[tokio::test]
async fn test_missing_credential_reports_unconfigured() {
    let server = MockServer::start().await;
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

    let tokens = token_manager(&server, store);
    let err = tokens.ensure_valid_token().await.unwrap_err();
    assert!(matches!(err, AppError::Unconfigured));
}

#[tokio::test]
async fn test_missing_refresh_token_is_a_refresh_error() {
    let server = MockServer::start().await;
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

    let credential = Credential {
        client_id: "test-client-id".to_string(),
        client_secret: "test-client-secret".to_string(),
        access_token: Some("expired".to_string()),
        refresh_token: None,
        expires_at: Some(Utc::now() - Duration::minutes(1)),
    };
    store.put_credential(&credential).await.unwrap();

    let tokens = token_manager(&server, store);
    let err = tokens.ensure_valid_token().await.unwrap_err();
    assert!(err.to_string().contains("No refresh token stored"));
}

#[tokio::test]
async fn test_unrotated_refresh_token_is_kept() {
    let server = MockServer::start().await;
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    common::seed_expiring_credential(store.as_ref(), "nearly-dead").await;

    // No refresh_token in the response: ours stays in place.
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "expires_in": 7200
        })))
        .mount(&server)
        .await;

    let tokens = token_manager(&server, store.clone());
    tokens.ensure_valid_token().await.unwrap();

    let credential = store.get_credential().await.unwrap().unwrap();
    assert_eq!(credential.refresh_token.as_deref(), Some("refresh-initial"));
}

#[tokio::test]
async fn test_reject_refresh_returns_replacement_token() {
    // Another task already swapped the token; no upstream call happens.
    let server = MockServer::start().await;
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    common::seed_valid_credential(store.as_ref(), "token-b").await;

    let tokens = token_manager(&server, store);
    let token = tokens.refresh_after_reject("token-a").await.unwrap();
    assert_eq!(token, "token-b");
}
