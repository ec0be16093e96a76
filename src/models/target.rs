// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Monitored account configuration.

use serde::{Deserialize, Serialize};

/// How the downstream consumer should surface a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Surface as soon as it arrives
    Immediate,
    /// Accumulate until the consumer's own cadence picks it up
    Batched,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Immediate => "immediate",
            DeliveryMode::Batched => "batched",
        }
    }
}

/// An account whose timeline gets polled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredTarget {
    /// Handle on the upstream platform, stored normalized
    /// (lowercase, no leading `@`)
    pub identity: String,
    pub delivery_mode: DeliveryMode,
    /// Route digests to a specific downstream channel
    /// (e.g. "telegram", "discord")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_override: Option<String>,
    /// Replaces the digest's default instruction line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_override: Option<String>,
}

impl MonitoredTarget {
    /// A target with stock delivery behavior (batched, no overrides).
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: Self::normalize_identity(&identity.into()),
            delivery_mode: DeliveryMode::Batched,
            channel_override: None,
            prompt_override: None,
        }
    }

    /// Normalize a user-supplied handle: trim, strip a leading `@`,
    /// lowercase.
    pub fn normalize_identity(raw: &str) -> String {
        raw.trim().trim_start_matches('@').to_lowercase()
    }
}

/// Per-target delivery configuration after defaults are applied.
#[derive(Debug, Clone)]
pub struct DeliveryPolicy {
    pub mode: DeliveryMode,
    pub channel: Option<String>,
    pub prompt: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_identity() {
        assert_eq!(MonitoredTarget::normalize_identity("@SomeBody "), "somebody");
        assert_eq!(MonitoredTarget::normalize_identity("plain"), "plain");
    }
}
