// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token lifecycle.
//!
//! The relay holds one upstream credential in the state store. This module
//! hands out an access token that is valid for at least the refresh
//! margin, refreshing through the OAuth endpoint when needed and
//! persisting the rotated credential before anyone sees the new token.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::models::Credential;
use crate::services::timeline::TimelineClient;
use crate::store::Store;

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Manages the stored credential and its refresh flow.
///
/// A failed refresh never touches the stored credential, so the next
/// cycle retries from the same state.
pub struct TokenManager {
    client: TimelineClient,
    store: Arc<dyn Store>,
    /// Serializes refreshes so concurrent callers produce one upstream call.
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(client: TimelineClient, store: Arc<dyn Store>) -> Self {
        Self {
            client,
            store,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Get an access token valid for at least the refresh margin.
    ///
    /// 1. Fast path: the stored token is still valid
    /// 2. Acquire the refresh lock
    /// 3. Re-check after the lock (another task may have refreshed)
    /// 4. Refresh upstream and persist the rotated credential
    pub async fn ensure_valid_token(&self) -> Result<String, AppError> {
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);

        // ─────────────────────────────────────────────────────────────
        // STEP 1: Fast path - stored token still valid
        // ─────────────────────────────────────────────────────────────
        let credential = self.require_credential().await?;
        if let Some(token) = credential.usable_access_token(margin) {
            return Ok(token.to_string());
        }

        // ─────────────────────────────────────────────────────────────
        // STEP 2: Acquire the refresh lock
        // ─────────────────────────────────────────────────────────────
        // Only one task refreshes; the rest wait here until it finishes.
        let _guard = self.refresh_lock.lock().await;

        // ─────────────────────────────────────────────────────────────
        // STEP 3: Re-check after acquiring the lock (double-check)
        // ─────────────────────────────────────────────────────────────
        // Another task may have refreshed while we were waiting.
        let credential = self.require_credential().await?;
        if let Some(token) = credential.usable_access_token(margin) {
            return Ok(token.to_string());
        }

        // ─────────────────────────────────────────────────────────────
        // STEP 4: Refresh upstream and persist
        // ─────────────────────────────────────────────────────────────
        self.refresh_locked(credential).await
    }

    /// Force a refresh after the upstream rejected `rejected_token`.
    ///
    /// Expiry bookkeeping said the token was fine but the server said 401
    /// (revocation, clock skew). If another task already replaced the
    /// rejected token, return the replacement instead of refreshing again.
    pub async fn refresh_after_reject(&self, rejected_token: &str) -> Result<String, AppError> {
        let _guard = self.refresh_lock.lock().await;

        let credential = self.require_credential().await?;
        match credential.access_token.as_deref() {
            Some(current) if current != rejected_token => Ok(current.to_string()),
            _ => self.refresh_locked(credential).await,
        }
    }

    async fn require_credential(&self) -> Result<Credential, AppError> {
        self.store
            .get_credential()
            .await?
            .ok_or(AppError::Unconfigured)
    }

    /// Refresh with the upstream and persist. Caller holds `refresh_lock`.
    async fn refresh_locked(&self, credential: Credential) -> Result<String, AppError> {
        let refresh_token = credential
            .refresh_token
            .clone()
            .ok_or_else(|| AppError::TokenRefresh("No refresh token stored".to_string()))?;

        tracing::info!("Access token expired or expiring, refreshing");

        let refreshed = self
            .client
            .refresh_token(
                &credential.client_id,
                &credential.client_secret,
                &refresh_token,
            )
            .await?;

        let updated = Credential {
            access_token: Some(refreshed.access_token.clone()),
            // Keep our refresh token when the response does not rotate it.
            refresh_token: refreshed.refresh_token.or(Some(refresh_token)),
            expires_at: Some(Utc::now() + Duration::seconds(refreshed.expires_in)),
            ..credential
        };
        self.store.put_credential(&updated).await?;

        tracing::info!("Token refreshed and stored");
        Ok(refreshed.access_token)
    }
}
