// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Poll orchestration.
//!
//! One cycle per target: ensure a valid token, fetch the timeline, drop
//! tweets already seen, format a digest, deliver it, record the outcome.
//! Exactly one poll run is recorded per executed cycle, success or error.
//! A cycle rejected because the target is already being polled records
//! nothing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::error::AppError;
use crate::models::{CommitPolicy, PollRun, Tweet};
use crate::services::digest::{format_digest, resolve_policy};
use crate::services::dispatch::{DeliveryResult, DeliveryTarget, Dispatcher, EventPayload};
use crate::services::timeline::{TimelineClient, TimelinePage};
use crate::services::token::TokenManager;
use crate::store::{RetentionPolicy, Store};

/// Outcome of polling every monitored target once.
#[derive(Debug, Default)]
pub struct SweepResult {
    /// One entry per target actually polled.
    pub runs: Vec<PollRun>,
    /// Targets skipped because a cycle was already in flight.
    pub skipped: Vec<String>,
}

impl SweepResult {
    /// True when at least one target exists and all of them were skipped.
    pub fn all_busy(&self) -> bool {
        self.runs.is_empty() && !self.skipped.is_empty()
    }
}

/// Runs poll cycles and records their outcomes.
pub struct Poller {
    store: Arc<dyn Store>,
    tokens: Arc<TokenManager>,
    timeline: TimelineClient,
    dispatcher: Dispatcher,
    retention: RetentionPolicy,
    /// Targets with a cycle currently in flight.
    running: DashMap<String, ()>,
}

impl Poller {
    pub fn new(
        store: Arc<dyn Store>,
        tokens: Arc<TokenManager>,
        timeline: TimelineClient,
        dispatcher: Dispatcher,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            store,
            tokens,
            timeline,
            dispatcher,
            retention,
            running: DashMap::new(),
        }
    }

    /// Poll every monitored target once, sequentially.
    pub async fn run_all(&self) -> SweepResult {
        let targets = match self.store.list_targets().await {
            Ok(targets) => targets,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list targets");
                return SweepResult::default();
            }
        };

        let mut sweep = SweepResult::default();
        for target in targets {
            match self.run_cycle(&target.identity).await {
                Ok(run) => sweep.runs.push(run),
                Err(AppError::AlreadyPolling) => sweep.skipped.push(target.identity),
                Err(e) => {
                    tracing::error!(target = %target.identity, error = %e, "Poll cycle failed");
                }
            }
        }
        sweep
    }

    /// Execute one poll cycle for `identity`.
    ///
    /// Returns `AlreadyPolling` without recording anything when a cycle
    /// for the same target is still in flight. Every other outcome,
    /// including upstream and delivery failures, becomes a recorded poll
    /// run returned as `Ok`.
    pub async fn run_cycle(&self, identity: &str) -> Result<PollRun, AppError> {
        let _guard = RunningGuard::acquire(&self.running, identity)?;

        let started_at = Utc::now();
        let run = match self.poll_target(identity, started_at).await {
            Ok(run) => run,
            Err(e) => {
                tracing::warn!(target = %identity, error = %e, "Poll cycle errored");
                PollRun::error(identity, started_at, e.to_string())
            }
        };

        if let Err(e) = self.store.append_poll_run(&run).await {
            // Lose the history entry, not the cycle result.
            tracing::error!(target = %identity, error = %e, "Failed to record poll run");
        }

        tracing::info!(
            target = %identity,
            found = run.tweets_found,
            new = run.tweets_new,
            status = ?run.status,
            "Poll cycle finished"
        );
        Ok(run)
    }

    /// The cycle body. Errors bubble to `run_cycle`, which records them.
    async fn poll_target(
        &self,
        identity: &str,
        started_at: DateTime<Utc>,
    ) -> Result<PollRun, AppError> {
        let settings = self.store.get_settings().await?;
        let token = self.tokens.ensure_valid_token().await?;

        let page = match self
            .fetch_with_refresh(&token, identity, settings.max_tweets_per_poll)
            .await
        {
            Ok(page) => page,
            Err(AppError::RateLimited) => {
                // Upstream throttled us. Nothing fetched, nothing new; the
                // next scheduled cycle tries again.
                tracing::warn!(target = %identity, "Rate limited, treating as empty poll");
                return Ok(PollRun::success(identity, started_at, 0, 0));
            }
            Err(e) => return Err(e),
        };

        let found = page.tweets.len() as u32;
        let ids: Vec<String> = page.tweets.iter().map(|t| t.id.clone()).collect();
        let seen = self.store.seen_subset(&ids).await?;
        let mut new_tweets: Vec<Tweet> = page
            .tweets
            .into_iter()
            .filter(|t| !seen.contains(&t.id))
            .collect();

        if new_tweets.is_empty() {
            self.evict(identity).await;
            return Ok(PollRun::success(identity, started_at, found, 0));
        }

        // Deliver oldest first so the digest reads chronologically.
        new_tweets.reverse();
        let new_ids: Vec<String> = new_tweets.iter().map(|t| t.id.clone()).collect();

        let target = self.store.get_target(identity).await?;
        let policy = resolve_policy(target.as_ref(), &settings);
        let message = format_digest(&new_tweets, &page.authors, &policy);
        let payload = EventPayload::timeline_update(message, policy.mode, policy.channel.clone());

        let delivery = match DeliveryTarget::from_settings(&settings) {
            Some(endpoint) => self.dispatcher.dispatch(&endpoint, &payload).await,
            None => DeliveryResult::failure("no delivery endpoint configured"),
        };

        // At-least-once by default: tweets only become "seen" once a
        // delivery attempt succeeded, so a failed send resurfaces them
        // next cycle. CommitPolicy::Always opts into at-most-once.
        if delivery.delivered || settings.commit_policy == CommitPolicy::Always {
            self.store.commit_seen(&new_ids, Utc::now()).await?;
        }

        self.evict(identity).await;

        let mut run = PollRun::success(identity, started_at, found, new_ids.len() as u32);
        if let Some(reason) = delivery.error {
            run.error = Some(format!("delivery failed: {}", reason));
        }
        Ok(run)
    }

    /// Fetch the timeline, retrying once with a fresh token after a 401.
    async fn fetch_with_refresh(
        &self,
        token: &str,
        identity: &str,
        max_tweets: u32,
    ) -> Result<TimelinePage, AppError> {
        match self
            .timeline
            .fetch_timeline(token, identity, max_tweets)
            .await
        {
            Err(AppError::Unauthorized) => {
                tracing::info!(target = %identity, "Token rejected upstream, refreshing once");
                let fresh = self.tokens.refresh_after_reject(token).await?;
                self.timeline
                    .fetch_timeline(&fresh, identity, max_tweets)
                    .await
            }
            other => other,
        }
    }

    /// Prune the seen ledger. Failures are logged, not fatal.
    async fn evict(&self, identity: &str) {
        match self.store.evict_seen(self.retention).await {
            Ok(0) => {}
            Ok(evicted) => {
                tracing::debug!(target = %identity, evicted, "Evicted seen records");
            }
            Err(e) => {
                tracing::warn!(target = %identity, error = %e, "Failed to evict seen records");
            }
        }
    }
}

/// In-flight marker for one target, removed on drop.
struct RunningGuard<'a> {
    running: &'a DashMap<String, ()>,
    identity: String,
}

impl<'a> RunningGuard<'a> {
    /// Claim `identity`, failing with `AlreadyPolling` when a cycle for it
    /// is still running.
    fn acquire(running: &'a DashMap<String, ()>, identity: &str) -> Result<Self, AppError> {
        match running.entry(identity.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(AppError::AlreadyPolling),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
                Ok(Self {
                    running,
                    identity: identity.to_string(),
                })
            }
        }
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.running.remove(&self.identity);
    }
}
