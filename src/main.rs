// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Timeline-Relay Server
//!
//! Polls the timelines of monitored X accounts on a fixed interval,
//! deduplicates against the seen-tweet ledger, and relays digests of new
//! tweets to a webhook or local command.

use std::sync::Arc;

use timeline_relay::{
    config::{Config, StateBackend},
    error::AppError,
    models::{Credential, MonitoredTarget, Settings},
    services::{Dispatcher, Poller, Scheduler, TimelineClient, TokenManager},
    store::{FileStore, MemoryStore, Store},
    AppState,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upstream and delivery requests that hang are cut off here.
const HTTP_TIMEOUT_SECS: u64 = 30;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Timeline-Relay");

    // Open the state backing
    let (store, fresh): (Arc<dyn Store>, bool) = match config.state_backend {
        StateBackend::File => {
            let file_store = FileStore::open(&config.state_path)
                .await
                .expect("Failed to open state file");
            let fresh = file_store.is_fresh();
            tracing::info!(
                path = %config.state_path.display(),
                fresh,
                "State file opened"
            );
            (Arc::new(file_store), fresh)
        }
        StateBackend::Memory => {
            tracing::warn!("Using in-memory state, nothing survives a restart");
            (Arc::new(MemoryStore::new()), true)
        }
    };

    // Seed a fresh store from the environment. An existing store is never
    // overwritten; the admin API owns live state.
    if fresh {
        seed_store(&config, store.as_ref())
            .await
            .expect("Failed to seed state");
    }

    // Shared HTTP client for upstream and webhook calls
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .expect("Failed to build HTTP client");

    let timeline = TimelineClient::new(http.clone(), config.api_base.clone());
    let tokens = Arc::new(TokenManager::new(timeline.clone(), store.clone()));
    let dispatcher = Dispatcher::new(http);
    let poller = Arc::new(Poller::new(
        store.clone(),
        tokens,
        timeline,
        dispatcher,
        config.retention,
    ));

    // Start the poll timer at the stored interval
    let shutdown = CancellationToken::new();
    let scheduler = Scheduler::new(poller.clone(), shutdown.clone());
    let interval = store
        .get_settings()
        .await
        .expect("Failed to read settings")
        .poll_interval_minutes;
    scheduler.start(interval).await;

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        poller,
        scheduler: scheduler.clone(),
    });

    // Build router
    let app = timeline_relay::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    // Let a sweep in flight finish before exiting
    scheduler.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Seed a fresh state store from environment configuration.
async fn seed_store(config: &Config, store: &dyn Store) -> Result<(), AppError> {
    if let (Some(client_id), Some(client_secret)) = (&config.client_id, &config.client_secret) {
        let credential = Credential {
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
            access_token: config.seed_access_token.clone(),
            refresh_token: config.seed_refresh_token.clone(),
            // Seed tokens are of unknown age; the first poll refreshes.
            expires_at: None,
        };
        store.put_credential(&credential).await?;
        tracing::info!("Seeded upstream credential from environment");
    }

    let settings = Settings {
        webhook_url: config.webhook_url.clone(),
        webhook_secret: config.webhook_secret.clone(),
        delivery_command: config.delivery_command.clone(),
        poll_interval_minutes: config.poll_interval_minutes,
        max_tweets_per_poll: config.max_tweets_per_poll,
        default_delivery_mode: config.default_delivery_mode,
        commit_policy: config.commit_policy,
        updated_at: chrono::Utc::now(),
    };
    store.put_settings(&settings).await?;

    if let Some(username) = &config.watch_username {
        let mut target = MonitoredTarget::new(username.clone());
        target.delivery_mode = config.default_delivery_mode;
        store.upsert_target(&target).await?;
        tracing::info!(target = %target.identity, "Seeded monitored target");
    }

    Ok(())
}

/// Resolve on SIGTERM or Ctrl+C, cancelling the poll timer.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    token.cancel();
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("timeline_relay=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
