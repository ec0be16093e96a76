//! Application configuration loaded from environment variables.
//!
//! The environment only seeds the service on first boot; everything that can
//! change at runtime (credentials, delivery settings, monitored targets)
//! lives in the state store afterwards and is edited through the admin API.

use std::env;
use std::path::PathBuf;

use crate::models::{CommitPolicy, DeliveryMode};
use crate::store::RetentionPolicy;

/// Which state store backing to open at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateBackend {
    /// Single JSON document on disk, written atomically.
    File,
    /// Ephemeral in-process store (tests, dry runs).
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Upstream API ---
    /// Base URL of the upstream timeline API
    pub api_base: String,
    /// OAuth client ID (seed for the credential store)
    pub client_id: Option<String>,
    /// OAuth client secret (seed for the credential store)
    pub client_secret: Option<String>,
    /// Initial access token, if one was obtained out of band
    pub seed_access_token: Option<String>,
    /// Initial refresh token, if one was obtained out of band
    pub seed_refresh_token: Option<String>,

    // --- Polling ---
    /// Username to monitor (seed for the target list)
    pub watch_username: Option<String>,
    /// Minutes between scheduled polls
    pub poll_interval_minutes: u32,
    /// Upper bound on tweets requested per poll
    pub max_tweets_per_poll: u32,
    /// Seen-tweet retention policy
    pub retention: RetentionPolicy,

    // --- Delivery ---
    /// Webhook endpoint for digests
    pub webhook_url: Option<String>,
    /// Shared secret for webhook signatures
    pub webhook_secret: Option<String>,
    /// Local command bridge, used when no webhook is configured
    pub delivery_command: Option<String>,
    /// Delivery mode for targets without an override
    pub default_delivery_mode: DeliveryMode,
    /// When to mark delivered tweets as seen
    pub commit_policy: CommitPolicy,

    // --- State store ---
    pub state_backend: StateBackend,
    pub state_path: PathBuf,

    // --- Server ---
    /// Server port
    pub port: u16,
    /// Bearer token protecting the admin API (open when unset)
    pub admin_token: Option<String>,
    /// Dashboard origin allowed by CORS
    pub dashboard_url: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_base: "https://api.x.com/2".to_string(),
            client_id: None,
            client_secret: None,
            seed_access_token: None,
            seed_refresh_token: None,
            watch_username: None,
            poll_interval_minutes: 5,
            max_tweets_per_poll: 10,
            retention: RetentionPolicy::default(),
            webhook_url: None,
            webhook_secret: None,
            delivery_command: None,
            default_delivery_mode: DeliveryMode::Batched,
            commit_policy: CommitPolicy::OnSuccess,
            state_backend: StateBackend::Memory,
            state_path: PathBuf::from("data/state.json"),
            port: 8080,
            admin_token: None,
            dashboard_url: "http://localhost:3000".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            api_base: env::var("X_API_BASE")
                .unwrap_or_else(|_| "https://api.x.com/2".to_string()),
            client_id: optional("X_CLIENT_ID"),
            client_secret: optional("X_CLIENT_SECRET"),
            seed_access_token: optional("X_ACCESS_TOKEN"),
            seed_refresh_token: optional("X_REFRESH_TOKEN"),

            watch_username: optional("WATCH_USERNAME"),
            poll_interval_minutes: env::var("POLL_INTERVAL_MINUTES")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            max_tweets_per_poll: env::var("MAX_TWEETS_PER_POLL")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            retention: retention_from_env()?,

            webhook_url: optional("WEBHOOK_URL"),
            webhook_secret: optional("WEBHOOK_SECRET"),
            delivery_command: optional("DELIVERY_COMMAND"),
            default_delivery_mode: match optional("DELIVERY_MODE").as_deref() {
                None | Some("batched") => DeliveryMode::Batched,
                Some("immediate") => DeliveryMode::Immediate,
                Some(other) => {
                    return Err(ConfigError::Invalid(format!(
                        "DELIVERY_MODE must be 'immediate' or 'batched', got '{other}'"
                    )))
                }
            },
            commit_policy: match optional("COMMIT_POLICY").as_deref() {
                None | Some("on-success") => CommitPolicy::OnSuccess,
                Some("always") => CommitPolicy::Always,
                Some(other) => {
                    return Err(ConfigError::Invalid(format!(
                        "COMMIT_POLICY must be 'on-success' or 'always', got '{other}'"
                    )))
                }
            },

            state_backend: match optional("STATE_BACKEND").as_deref() {
                None | Some("file") => StateBackend::File,
                Some("memory") => StateBackend::Memory,
                Some(other) => {
                    return Err(ConfigError::Invalid(format!(
                        "STATE_BACKEND must be 'file' or 'memory', got '{other}'"
                    )))
                }
            },
            state_path: env::var("STATE_PATH")
                .unwrap_or_else(|_| "data/state.json".to_string())
                .into(),

            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            admin_token: optional("ADMIN_TOKEN"),
            dashboard_url: env::var("DASHBOARD_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }
}

/// Read an optional env var, treating empty values as unset.
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Build the retention policy from `RETENTION_POLICY` plus its parameter.
///
/// Exactly one policy is active: `age` keeps seen tweets for
/// `RETENTION_DAYS` days, `count` keeps the most recent `RETENTION_COUNT`.
fn retention_from_env() -> Result<RetentionPolicy, ConfigError> {
    match optional("RETENTION_POLICY").as_deref() {
        None | Some("age") => {
            let days = env::var("RETENTION_DAYS")
                .unwrap_or_else(|_| RetentionPolicy::DEFAULT_DAYS.to_string())
                .parse()
                .unwrap_or(RetentionPolicy::DEFAULT_DAYS);
            Ok(RetentionPolicy::MaxAge { days })
        }
        Some("count") => {
            let max = env::var("RETENTION_COUNT")
                .unwrap_or_else(|_| RetentionPolicy::DEFAULT_COUNT.to_string())
                .parse()
                .unwrap_or(RetentionPolicy::DEFAULT_COUNT);
            Ok(RetentionPolicy::MaxCount { max })
        }
        Some(other) => Err(ConfigError::Invalid(format!(
            "RETENTION_POLICY must be 'age' or 'count', got '{other}'"
        ))),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
