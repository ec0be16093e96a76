// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Tweet and author models from the upstream timeline API.

use serde::{Deserialize, Serialize};

/// A tweet as returned by the timeline endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tweet {
    /// Upstream tweet ID (opaque string, the dedup key)
    pub id: String,
    /// Upstream user ID of the author
    #[serde(default)]
    pub author_id: String,
    /// Tweet text
    pub text: String,
    /// Creation time as reported upstream (RFC3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Engagement counters; tweets without metrics count as zero
    #[serde(default)]
    pub public_metrics: PublicMetrics,
}

impl Tweet {
    /// Likes plus retweets, the score behind the digest's 🔥 marker.
    pub fn engagement(&self) -> u32 {
        self.public_metrics
            .like_count
            .saturating_add(self.public_metrics.retweet_count)
    }
}

/// Engagement counters attached to a tweet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicMetrics {
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub retweet_count: u32,
    #[serde(default)]
    pub reply_count: u32,
}

/// Author metadata from the `includes.users` expansion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetAuthor {
    /// Upstream user ID (matches `Tweet::author_id`)
    pub id: String,
    /// Handle without the leading `@`
    pub username: String,
    /// Display name
    #[serde(default)]
    pub name: String,
}
