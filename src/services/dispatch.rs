// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Digest delivery.
//!
//! Sends a formatted digest to the configured endpoint: an HTTP webhook
//! (optionally HMAC-signed) or a local command. Failures are reported in
//! the [`DeliveryResult`], never as errors; a failed delivery must not
//! abort the poll cycle that produced it.

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use crate::models::{DeliveryMode, Settings};
use crate::time_utils::format_utc_rfc3339;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature when a secret is configured.
const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Payload posted to the webhook.
#[derive(Debug, Serialize)]
pub struct EventPayload {
    pub event: &'static str,
    pub message: String,
    pub mode: DeliveryMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub timestamp: String,
}

impl EventPayload {
    pub fn timeline_update(message: String, mode: DeliveryMode, channel: Option<String>) -> Self {
        Self {
            event: "timeline_update",
            message,
            mode,
            channel,
            timestamp: format_utc_rfc3339(chrono::Utc::now()),
        }
    }
}

/// Outcome of a delivery attempt.
#[derive(Debug, Clone)]
pub struct DeliveryResult {
    pub delivered: bool,
    pub error: Option<String>,
}

impl DeliveryResult {
    pub fn success() -> Self {
        Self {
            delivered: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            delivered: false,
            error: Some(error.into()),
        }
    }
}

/// Where digests go.
#[derive(Debug, Clone)]
pub enum DeliveryTarget {
    Webhook { url: String, secret: Option<String> },
    Command { program: String },
}

impl DeliveryTarget {
    /// Pick the delivery endpoint from settings. The webhook wins when
    /// both are configured.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        if let Some(url) = settings.webhook_url.clone() {
            return Some(Self::Webhook {
                url,
                secret: settings.webhook_secret.clone(),
            });
        }
        settings
            .delivery_command
            .clone()
            .map(|program| Self::Command { program })
    }
}

/// Posts digests to their delivery endpoint.
#[derive(Clone)]
pub struct Dispatcher {
    http: reqwest::Client,
}

impl Dispatcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Deliver `payload` to `target`.
    pub async fn dispatch(
        &self,
        target: &DeliveryTarget,
        payload: &EventPayload,
    ) -> DeliveryResult {
        let result = match target {
            DeliveryTarget::Webhook { url, secret } => {
                self.post_webhook(url, secret.as_deref(), payload).await
            }
            DeliveryTarget::Command { program } => run_command(program, payload).await,
        };

        match result {
            Ok(()) => DeliveryResult::success(),
            Err(message) => {
                tracing::warn!(error = %message, "Delivery failed");
                DeliveryResult::failure(message)
            }
        }
    }

    async fn post_webhook(
        &self,
        url: &str,
        secret: Option<&str>,
        payload: &EventPayload,
    ) -> Result<(), String> {
        // Sign the exact bytes we send; the receiver verifies against the
        // raw body, and re-serializing need not reproduce it.
        let body = serde_json::to_vec(payload).map_err(|e| e.to_string())?;

        let mut request = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        if let Some(secret) = secret {
            request = request.header(SIGNATURE_HEADER, sign_payload(secret, &body)?);
        }

        let response = request.body(body).send().await.map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("webhook returned HTTP {}", response.status()));
        }
        Ok(())
    }
}

/// `sha256=<hex>` HMAC-SHA256 over the payload bytes.
fn sign_payload(secret: &str, body: &[u8]) -> Result<String, String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| format!("HMAC init failed: {}", e))?;
    mac.update(body);
    let signature = mac.finalize().into_bytes();
    Ok(format!("sha256={}", hex::encode(signature)))
}

/// Hand the digest to a local command. No shell involved; the message
/// goes through as a single argument.
async fn run_command(program: &str, payload: &EventPayload) -> Result<(), String> {
    let output = tokio::process::Command::new(program)
        .args([
            "system",
            "event",
            "--text",
            &payload.message,
            "--mode",
            payload.mode.as_str(),
        ])
        .output()
        .await
        .map_err(|e| format!("failed to run {}: {}", program, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        ));
    }
    Ok(())
}
