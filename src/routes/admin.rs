// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin API routes for configuration, targets, and manual polling.

use crate::error::Result;
use crate::models::{CommitPolicy, DeliveryMode, MonitoredTarget, PollRun};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::{Validate, ValidateUrl};

const DEFAULT_POLLS_LIMIT: usize = 20;
const MAX_POLLS_LIMIT: usize = 100;
const MAX_IDENTITY_LEN: usize = 50;

/// Admin routes (require the admin bearer token).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/config", get(get_config).put(update_config))
        .route("/api/poll", post(trigger_poll))
        .route("/api/polls", get(get_polls))
        .route("/api/status", get(get_status))
        .route("/api/targets", get(list_targets))
        .route(
            "/api/targets/{identity}",
            put(upsert_target).delete(remove_target),
        )
}

// ─── Config ──────────────────────────────────────────────────

/// Redacted view of the relay configuration. Secrets never appear here,
/// only whether they exist.
#[derive(Serialize)]
pub struct ConfigResponse {
    pub has_credentials: bool,
    pub has_tokens: bool,
    pub webhook_url: Option<String>,
    pub has_webhook_secret: bool,
    pub delivery_command: Option<String>,
    pub poll_interval_minutes: u32,
    pub max_tweets_per_poll: u32,
    pub default_delivery_mode: DeliveryMode,
    pub commit_policy: CommitPolicy,
    pub updated_at: String,
}

/// Get the current configuration, redacted.
async fn get_config(State(state): State<Arc<AppState>>) -> Result<Json<ConfigResponse>> {
    let credential = state.store.get_credential().await?;
    let settings = state.store.get_settings().await?;

    Ok(Json(ConfigResponse {
        has_credentials: credential.is_some(),
        has_tokens: credential
            .as_ref()
            .is_some_and(|c| c.access_token.is_some() || c.refresh_token.is_some()),
        webhook_url: settings.webhook_url.clone(),
        has_webhook_secret: settings.webhook_secret.is_some(),
        delivery_command: settings.delivery_command.clone(),
        poll_interval_minutes: settings.poll_interval_minutes,
        max_tweets_per_poll: settings.max_tweets_per_poll,
        default_delivery_mode: settings.default_delivery_mode,
        commit_policy: settings.commit_policy,
        updated_at: crate::time_utils::format_utc_rfc3339(settings.updated_at),
    }))
}

/// Settings update. Absent fields stay unchanged; an empty string clears
/// an optional field.
#[derive(Deserialize, Validate)]
pub struct UpdateConfigRequest {
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub delivery_command: Option<String>,
    #[validate(range(min = 1, max = 1440))]
    pub poll_interval_minutes: Option<u32>,
    #[validate(range(min = 5, max = 100))]
    pub max_tweets_per_poll: Option<u32>,
    pub default_delivery_mode: Option<DeliveryMode>,
    pub commit_policy: Option<CommitPolicy>,
}

/// For optional string fields: `None` means leave alone, `Some(None)`
/// means clear, `Some(Some(v))` means set.
fn clean_optional(field: Option<String>) -> Option<Option<String>> {
    field.map(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn apply_optional(slot: &mut Option<String>, update: Option<Option<String>>) {
    if let Some(value) = update {
        *slot = value;
    }
}

/// Update settings and reschedule the poll timer if the interval changed.
async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateConfigRequest>,
) -> Result<Json<ConfigResponse>> {
    payload
        .validate()
        .map_err(|e| crate::error::AppError::BadRequest(e.to_string()))?;

    let webhook_url = clean_optional(payload.webhook_url);
    if let Some(Some(url)) = &webhook_url {
        if !url.validate_url() {
            return Err(crate::error::AppError::BadRequest(
                "webhook_url must be a valid URL".to_string(),
            ));
        }
    }

    let mut settings = state.store.get_settings().await?;
    let old_interval = settings.poll_interval_minutes;

    apply_optional(&mut settings.webhook_url, webhook_url);
    apply_optional(
        &mut settings.webhook_secret,
        clean_optional(payload.webhook_secret),
    );
    apply_optional(
        &mut settings.delivery_command,
        clean_optional(payload.delivery_command),
    );
    if let Some(interval) = payload.poll_interval_minutes {
        settings.poll_interval_minutes = interval;
    }
    if let Some(max) = payload.max_tweets_per_poll {
        settings.max_tweets_per_poll = max;
    }
    if let Some(mode) = payload.default_delivery_mode {
        settings.default_delivery_mode = mode;
    }
    if let Some(policy) = payload.commit_policy {
        settings.commit_policy = policy;
    }
    settings.updated_at = chrono::Utc::now();

    state.store.put_settings(&settings).await?;

    if settings.poll_interval_minutes != old_interval {
        tracing::info!(
            old = old_interval,
            new = settings.poll_interval_minutes,
            "Poll interval changed, rescheduling"
        );
        state.scheduler.start(settings.poll_interval_minutes).await;
    }

    get_config(State(state)).await
}

// ─── Polling ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct PollQuery {
    /// Poll only this target instead of sweeping all of them
    target: Option<String>,
}

#[derive(Serialize)]
pub struct PollResponse {
    pub runs: Vec<PollRun>,
    pub skipped: Vec<String>,
}

/// Trigger a poll sweep (or a single-target poll) right now.
async fn trigger_poll(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PollQuery>,
) -> Result<Json<PollResponse>> {
    if let Some(raw) = params.target {
        let identity = MonitoredTarget::normalize_identity(&raw);
        if identity.is_empty() {
            return Err(crate::error::AppError::BadRequest(
                "target must not be empty".to_string(),
            ));
        }

        tracing::info!(target = %identity, "Manual poll requested");
        let run = state.poller.run_cycle(&identity).await?;
        return Ok(Json(PollResponse {
            runs: vec![run],
            skipped: vec![],
        }));
    }

    tracing::info!("Manual sweep requested");
    let sweep = state.poller.run_all().await;
    if sweep.all_busy() {
        return Err(crate::error::AppError::AlreadyPolling);
    }

    Ok(Json(PollResponse {
        runs: sweep.runs,
        skipped: sweep.skipped,
    }))
}

#[derive(Deserialize)]
struct PollsQuery {
    #[serde(default = "default_polls_limit")]
    limit: usize,
}

fn default_polls_limit() -> usize {
    DEFAULT_POLLS_LIMIT
}

#[derive(Serialize)]
pub struct PollHistoryResponse {
    pub polls: Vec<PollRun>,
}

/// Recent poll history, newest first.
async fn get_polls(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PollsQuery>,
) -> Result<Json<PollHistoryResponse>> {
    let limit = params.limit.min(MAX_POLLS_LIMIT);
    let polls = state.store.recent_poll_runs(limit).await?;
    Ok(Json(PollHistoryResponse { polls }))
}

// ─── Status ──────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    /// True when a credential with tokens is on file
    pub configured: bool,
    pub last_poll: Option<PollRun>,
    pub seen_tweets: usize,
    pub poll_interval_minutes: u32,
    pub targets: usize,
}

/// Relay liveness summary for dashboards.
async fn get_status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>> {
    let credential = state.store.get_credential().await?;
    let settings = state.store.get_settings().await?;
    let last_poll = state.store.recent_poll_runs(1).await?.into_iter().next();
    let seen_tweets = state.store.seen_count().await?;
    let targets = state.store.list_targets().await?.len();

    Ok(Json(StatusResponse {
        configured: credential
            .is_some_and(|c| c.access_token.is_some() || c.refresh_token.is_some()),
        last_poll,
        seen_tweets,
        poll_interval_minutes: settings.poll_interval_minutes,
        targets,
    }))
}

// ─── Targets ─────────────────────────────────────────────────

/// List monitored targets.
async fn list_targets(State(state): State<Arc<AppState>>) -> Result<Json<Vec<MonitoredTarget>>> {
    Ok(Json(state.store.list_targets().await?))
}

/// Target upsert. Absent fields keep their current value (or the default
/// for a new target); empty strings clear the overrides.
#[derive(Deserialize)]
pub struct UpsertTargetRequest {
    pub delivery_mode: Option<DeliveryMode>,
    pub channel: Option<String>,
    pub prompt: Option<String>,
}

/// Create or update a monitored target.
async fn upsert_target(
    State(state): State<Arc<AppState>>,
    Path(raw_identity): Path<String>,
    Json(payload): Json<UpsertTargetRequest>,
) -> Result<Json<MonitoredTarget>> {
    let identity = MonitoredTarget::normalize_identity(&raw_identity);
    if identity.is_empty() || identity.len() > MAX_IDENTITY_LEN {
        return Err(crate::error::AppError::BadRequest(format!(
            "target identity must be 1-{} characters",
            MAX_IDENTITY_LEN
        )));
    }

    let mut target = state
        .store
        .get_target(&identity)
        .await?
        .unwrap_or_else(|| MonitoredTarget::new(identity.clone()));

    if let Some(mode) = payload.delivery_mode {
        target.delivery_mode = mode;
    }
    apply_optional(&mut target.channel_override, clean_optional(payload.channel));
    apply_optional(&mut target.prompt_override, clean_optional(payload.prompt));

    state.store.upsert_target(&target).await?;
    tracing::info!(target = %identity, "Target upserted");

    Ok(Json(target))
}

/// Remove a monitored target.
async fn remove_target(
    State(state): State<Arc<AppState>>,
    Path(raw_identity): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let identity = MonitoredTarget::normalize_identity(&raw_identity);

    if !state.store.remove_target(&identity).await? {
        return Err(crate::error::AppError::NotFound(format!(
            "Target {}",
            identity
        )));
    }

    tracing::info!(target = %identity, "Target removed");
    Ok(Json(serde_json::json!({ "removed": identity })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_optional_distinguishes_clear_from_absent() {
        assert_eq!(clean_optional(None), None);
        assert_eq!(clean_optional(Some("  ".to_string())), Some(None));
        assert_eq!(
            clean_optional(Some(" x ".to_string())),
            Some(Some("x".to_string()))
        );
    }

    #[test]
    fn test_apply_optional() {
        let mut slot = Some("keep".to_string());
        apply_optional(&mut slot, None);
        assert_eq!(slot.as_deref(), Some("keep"));

        apply_optional(&mut slot, Some(None));
        assert_eq!(slot, None);

        apply_optional(&mut slot, Some(Some("new".to_string())));
        assert_eq!(slot.as_deref(), Some("new"));
    }
}
