//! Runtime-mutable service settings.
//!
//! Seeded from the environment when the state store is first created,
//! then owned by the store and edited through the admin API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::DeliveryMode;

/// When delivered tweets get committed to the seen set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitPolicy {
    /// Commit only after a successful dispatch. A failed digest leaves
    /// its tweets unseen, so they surface again next cycle
    /// (at-least-once delivery).
    OnSuccess,
    /// Commit whether or not the dispatch succeeded (at-most-once).
    Always,
}

/// Service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Webhook endpoint for digests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Shared secret for webhook signatures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,
    /// Local command bridge, used when no webhook is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_command: Option<String>,
    /// Minutes between scheduled polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_minutes: u32,
    /// Upper bound on tweets requested per poll
    #[serde(default = "default_max_tweets")]
    pub max_tweets_per_poll: u32,
    /// Delivery mode for targets without an override
    #[serde(default = "default_delivery_mode")]
    pub default_delivery_mode: DeliveryMode,
    #[serde(default = "default_commit_policy")]
    pub commit_policy: CommitPolicy,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_poll_interval() -> u32 {
    5
}
fn default_max_tweets() -> u32 {
    10
}
fn default_delivery_mode() -> DeliveryMode {
    DeliveryMode::Batched
}
fn default_commit_policy() -> CommitPolicy {
    CommitPolicy::OnSuccess
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            webhook_secret: None,
            delivery_command: None,
            poll_interval_minutes: default_poll_interval(),
            max_tweets_per_poll: default_max_tweets(),
            default_delivery_mode: default_delivery_mode(),
            commit_policy: default_commit_policy(),
            updated_at: Utc::now(),
        }
    }
}
