// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduler integration tests.
//!
//! Drives the poll timer with sub-second periods against a mocked
//! upstream and checks the run history it leaves behind:
//! 1. A started timer sweeps once per period
//! 2. Restarting replaces the timer instead of adding a second one
//! 3. Shutdown stops sweeps for good

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

use timeline_relay::config::Config;
use timeline_relay::services::{Poller, Scheduler};
use timeline_relay::store::{MemoryStore, Store};

/// A poller whose sweeps always succeed with zero tweets, plus its store.
async fn polling_fixture(server: &MockServer) -> (Arc<Poller>, Arc<dyn Store>) {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    common::seed_valid_credential(store.as_ref(), "token-1").await;
    common::seed_target(store.as_ref(), "elonmusk").await;
    common::mount_user_lookup(server, "elonmusk", "99").await;
    common::mount_timeline(server, "99", json!([]), json!([])).await;

    let config = Config {
        api_base: server.uri(),
        ..Config::default()
    };
    let poller = common::build_poller(&config, store.clone());
    (poller, store)
}

async fn run_count(store: &dyn Store) -> usize {
    store.recent_poll_runs(100).await.unwrap().len()
}

#[tokio::test]
async fn test_timer_sweeps_periodically() {
    let server = MockServer::start().await;
    let (poller, store) = polling_fixture(&server).await;
    let scheduler = Scheduler::new(poller, CancellationToken::new());

    scheduler
        .start_with_period(Duration::from_millis(100))
        .await;
    tokio::time::sleep(Duration::from_millis(450)).await;
    scheduler.shutdown().await;

    assert!(run_count(store.as_ref()).await >= 2);
}

#[tokio::test]
async fn test_restart_replaces_timer() {
    let server = MockServer::start().await;
    let (poller, store) = polling_fixture(&server).await;
    let scheduler = Scheduler::new(poller, CancellationToken::new());

    // The short timer is replaced before its first tick; the long one
    // never gets to tick inside the test window.
    scheduler
        .start_with_period(Duration::from_millis(100))
        .await;
    scheduler.start_with_period(Duration::from_secs(10)).await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    scheduler.shutdown().await;

    assert_eq!(run_count(store.as_ref()).await, 0);
}

#[tokio::test]
async fn test_shutdown_stops_sweeps() {
    let server = MockServer::start().await;
    let (poller, store) = polling_fixture(&server).await;
    let scheduler = Scheduler::new(poller, CancellationToken::new());

    scheduler
        .start_with_period(Duration::from_millis(100))
        .await;
    tokio::time::sleep(Duration::from_millis(250)).await;
    scheduler.shutdown().await;

    let stopped_at = run_count(store.as_ref()).await;
    assert!(stopped_at >= 1);

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(run_count(store.as_ref()).await, stopped_at);
}
