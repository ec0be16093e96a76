// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Audit records for poll cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal state of a poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    Success,
    Error,
}

/// One record per executed poll cycle. Append-only; never mutated after
/// creation. A cycle that was rejected because the target was already
/// being polled produces no record at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollRun {
    /// Identity that was polled
    pub target: String,
    pub started_at: DateTime<Utc>,
    /// Tweets returned by the upstream fetch
    pub tweets_found: u32,
    /// Tweets not in the seen set
    pub tweets_new: u32,
    pub status: PollStatus,
    /// Failure detail for error runs, or a delivery problem on an
    /// otherwise successful run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PollRun {
    pub fn success(target: &str, started_at: DateTime<Utc>, found: u32, new: u32) -> Self {
        Self {
            target: target.to_string(),
            started_at,
            tweets_found: found,
            tweets_new: new,
            status: PollStatus::Success,
            error: None,
        }
    }

    pub fn error(target: &str, started_at: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            target: target.to_string(),
            started_at,
            tweets_found: 0,
            tweets_new: 0,
            status: PollStatus::Error,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PollStatus::Success
    }
}
