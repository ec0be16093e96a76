//! Persistent relay state.
//!
//! Everything the poller needs across restarts lives in one
//! [`StateDocument`]:
//! - Upstream OAuth credential (tokens + expiry)
//! - Delivery settings and monitored targets
//! - The seen-tweet ledger used for deduplication
//! - Recent poll history for the admin API
//!
//! The [`Store`] trait abstracts over the JSON-file backing used in
//! production and the in-memory backing used by tests. Both share the
//! document operations defined here, so dedup semantics cannot drift
//! between backings.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{Credential, MonitoredTarget, PollRun, Settings};

/// Poll history kept per state document. Older runs are dropped on append.
const MAX_POLL_RUNS: usize = 200;

/// How long the seen-tweet ledger holds on to entries.
///
/// Exactly one policy is active at a time; both prune strictly more than
/// they keep, so a tweet re-fetched while its record is still live is
/// never re-delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Drop records observed more than `days` days ago.
    MaxAge { days: i64 },
    /// Keep only the `max` most recently observed records.
    MaxCount { max: usize },
}

impl RetentionPolicy {
    pub const DEFAULT_DAYS: i64 = 7;
    pub const DEFAULT_COUNT: usize = 500;
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::MaxAge {
            days: Self::DEFAULT_DAYS,
        }
    }
}

/// One entry in the seen-tweet ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeenRecord {
    pub tweet_id: String,
    pub observed_at: DateTime<Utc>,
}

/// The full persisted state, serialized as a single JSON document.
///
/// Every field defaults, so a document written by an older build (or an
/// empty `{}`) always deserializes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub credential: Option<Credential>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub targets: Vec<MonitoredTarget>,
    #[serde(default)]
    pub seen: Vec<SeenRecord>,
    #[serde(default)]
    pub poll_runs: Vec<PollRun>,
}

impl StateDocument {
    /// Which of `ids` are already in the seen ledger.
    pub fn seen_subset(&self, ids: &[String]) -> HashSet<String> {
        let known: HashSet<&str> = self.seen.iter().map(|r| r.tweet_id.as_str()).collect();
        ids.iter()
            .filter(|id| known.contains(id.as_str()))
            .cloned()
            .collect()
    }

    /// Record `ids` as seen. Ids already in the ledger keep their original
    /// `observed_at`, so committing the same batch twice is a no-op.
    pub fn commit_seen(&mut self, ids: &[String], observed_at: DateTime<Utc>) {
        let mut known: HashSet<String> =
            self.seen.iter().map(|r| r.tweet_id.clone()).collect();
        for id in ids {
            if known.insert(id.clone()) {
                self.seen.push(SeenRecord {
                    tweet_id: id.clone(),
                    observed_at,
                });
            }
        }
    }

    /// Prune the seen ledger, returning how many records were dropped.
    ///
    /// Records are appended in observation order, so the oldest entries sit
    /// at the front of the vector.
    pub fn evict_seen(&mut self, policy: RetentionPolicy, now: DateTime<Utc>) -> usize {
        let before = self.seen.len();
        match policy {
            RetentionPolicy::MaxAge { days } => {
                let cutoff = now - Duration::days(days);
                self.seen.retain(|r| r.observed_at > cutoff);
            }
            RetentionPolicy::MaxCount { max } => {
                if self.seen.len() > max {
                    let excess = self.seen.len() - max;
                    self.seen.drain(..excess);
                }
            }
        }
        before - self.seen.len()
    }

    pub fn target(&self, identity: &str) -> Option<&MonitoredTarget> {
        self.targets.iter().find(|t| t.identity == identity)
    }

    /// Insert or replace a target, keyed by identity.
    pub fn upsert_target(&mut self, target: MonitoredTarget) {
        match self.targets.iter_mut().find(|t| t.identity == target.identity) {
            Some(slot) => *slot = target,
            None => self.targets.push(target),
        }
    }

    /// Remove a target. Returns false if no target had that identity.
    pub fn remove_target(&mut self, identity: &str) -> bool {
        let before = self.targets.len();
        self.targets.retain(|t| t.identity != identity);
        self.targets.len() < before
    }

    /// Append to poll history, dropping the oldest runs past the cap.
    pub fn append_poll_run(&mut self, run: PollRun) {
        self.poll_runs.push(run);
        if self.poll_runs.len() > MAX_POLL_RUNS {
            let excess = self.poll_runs.len() - MAX_POLL_RUNS;
            self.poll_runs.drain(..excess);
        }
    }

    /// Most recent runs first.
    pub fn recent_poll_runs(&self, limit: usize) -> Vec<PollRun> {
        self.poll_runs.iter().rev().take(limit).cloned().collect()
    }
}

/// Backing-agnostic interface to relay state.
///
/// Read methods return snapshots; write methods are atomic with respect to
/// each other. A failed write must leave previously stored state intact.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_credential(&self) -> Result<Option<Credential>, AppError>;
    async fn put_credential(&self, credential: &Credential) -> Result<(), AppError>;

    async fn get_settings(&self) -> Result<Settings, AppError>;
    async fn put_settings(&self, settings: &Settings) -> Result<(), AppError>;

    async fn list_targets(&self) -> Result<Vec<MonitoredTarget>, AppError>;
    async fn get_target(&self, identity: &str) -> Result<Option<MonitoredTarget>, AppError>;
    async fn upsert_target(&self, target: &MonitoredTarget) -> Result<(), AppError>;
    async fn remove_target(&self, identity: &str) -> Result<bool, AppError>;

    /// Which of `ids` have been seen before. Read-only.
    async fn seen_subset(&self, ids: &[String]) -> Result<HashSet<String>, AppError>;
    /// Mark `ids` seen. Idempotent.
    async fn commit_seen(&self, ids: &[String], observed_at: DateTime<Utc>)
        -> Result<(), AppError>;
    /// Prune the seen ledger per `policy`. Returns the number evicted.
    async fn evict_seen(&self, policy: RetentionPolicy) -> Result<usize, AppError>;
    async fn seen_count(&self) -> Result<usize, AppError>;

    async fn append_poll_run(&self, run: &PollRun) -> Result<(), AppError>;
    async fn recent_poll_runs(&self, limit: usize) -> Result<Vec<PollRun>, AppError>;
}
