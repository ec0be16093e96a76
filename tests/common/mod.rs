// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for integration tests.
//!
//! Tests run against the real router and services, backed by an in-memory
//! store. Upstream timeline traffic goes to a wiremock server; each test
//! mounts the responses it needs and points `Config::api_base` at it.

use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use timeline_relay::config::Config;
use timeline_relay::models::{Credential, MonitoredTarget};
use timeline_relay::routes::create_router;
use timeline_relay::services::{Dispatcher, Poller, Scheduler, TimelineClient, TokenManager};
use timeline_relay::store::{MemoryStore, Store};
use timeline_relay::AppState;

/// Build a poller wired to `config.api_base`, sharing `store`.
#[allow(dead_code)]
pub fn build_poller(config: &Config, store: Arc<dyn Store>) -> Arc<Poller> {
    let http = reqwest::Client::new();
    let timeline = TimelineClient::new(http.clone(), config.api_base.clone());
    let tokens = Arc::new(TokenManager::new(timeline.clone(), store.clone()));
    let dispatcher = Dispatcher::new(http);
    Arc::new(Poller::new(
        store,
        tokens,
        timeline,
        dispatcher,
        config.retention,
    ))
}

/// Build the full app on a fresh in-memory store.
///
/// The scheduler is constructed but never started; tests drive polls
/// through the API or the poller directly.
#[allow(dead_code)]
pub fn build_app(config: Config) -> (Router, Arc<AppState>) {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let poller = build_poller(&config, store.clone());
    let scheduler = Scheduler::new(poller.clone(), CancellationToken::new());
    let state = Arc::new(AppState {
        config,
        store,
        poller,
        scheduler,
    });
    (create_router(state.clone()), state)
}

/// Store a credential whose access token stays valid well past the
/// refresh margin.
#[allow(dead_code)]
pub async fn seed_valid_credential(store: &dyn Store, access_token: &str) {
    put_credential(store, access_token, Utc::now() + Duration::hours(2)).await;
}

/// Store a credential that expires inside the refresh margin, so the
/// next token check refreshes it.
#[allow(dead_code)]
pub async fn seed_expiring_credential(store: &dyn Store, access_token: &str) {
    put_credential(store, access_token, Utc::now() + Duration::seconds(60)).await;
}

#[allow(dead_code)]
async fn put_credential(store: &dyn Store, access_token: &str, expires_at: chrono::DateTime<Utc>) {
    let credential = Credential {
        client_id: "test-client-id".to_string(),
        client_secret: "test-client-secret".to_string(),
        access_token: Some(access_token.to_string()),
        refresh_token: Some("refresh-initial".to_string()),
        expires_at: Some(expires_at),
    };
    store
        .put_credential(&credential)
        .await
        .expect("seed credential");
}

#[allow(dead_code)]
pub async fn seed_target(store: &dyn Store, identity: &str) {
    store
        .upsert_target(&MonitoredTarget::new(identity))
        .await
        .expect("seed target");
}

/// Point delivery at `url`, optionally signing with `secret`.
#[allow(dead_code)]
pub async fn seed_webhook(store: &dyn Store, url: &str, secret: Option<&str>) {
    let mut settings = store.get_settings().await.expect("load settings");
    settings.webhook_url = Some(url.to_string());
    settings.webhook_secret = secret.map(str::to_string);
    store.put_settings(&settings).await.expect("seed webhook");
}

/// Mount the username lookup the timeline client performs before its
/// first fetch for a target.
#[allow(dead_code)]
pub async fn mount_user_lookup(server: &MockServer, username: &str, user_id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/users/by/username/{username}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": user_id, "username": username, "name": "Test User" }
        })))
        .mount(server)
        .await;
}

/// Mount a timeline page for `user_id`. `tweets` is the raw `data`
/// array, newest first, as the upstream API orders it.
#[allow(dead_code)]
pub async fn mount_timeline(
    server: &MockServer,
    user_id: &str,
    tweets: serde_json::Value,
    users: serde_json::Value,
) {
    Mock::given(method("GET"))
        .and(path(format!("/users/{user_id}/tweets")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": tweets,
            "includes": { "users": users }
        })))
        .mount(server)
        .await;
}

/// A tweet object shaped the way the upstream API returns it.
#[allow(dead_code)]
pub fn tweet_json(
    id: &str,
    author_id: &str,
    text: &str,
    likes: u32,
    retweets: u32,
) -> serde_json::Value {
    json!({
        "id": id,
        "author_id": author_id,
        "text": text,
        "created_at": "2026-01-10T12:00:00.000Z",
        "public_metrics": { "like_count": likes, "retweet_count": retweets, "reply_count": 0 }
    })
}

/// Read and parse a JSON response body.
#[allow(dead_code)]
pub async fn body_json(response: axum::http::Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response body")
}
