// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! X API client for reading user timelines.
//!
//! Handles:
//! - Username to user-id resolution (cached per process)
//! - Timeline fetching with public metrics and author expansion
//! - OAuth token refresh
//! - Rate limit and auth rejection detection

use std::sync::Arc;

use dashmap::DashMap;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::{Tweet, TweetAuthor};

// The user-tweets endpoint rejects max_results outside this range.
const MIN_PAGE_SIZE: u32 = 5;
const MAX_PAGE_SIZE: u32 = 100;

/// X API v2 client.
#[derive(Clone)]
pub struct TimelineClient {
    http: reqwest::Client,
    base_url: String,
    /// Username -> numeric user id. Ids are stable, so resolve once.
    user_ids: Arc<DashMap<String, String>>,
}

/// One page of a user's timeline, newest tweet first, plus the expanded
/// author objects referenced by `author_id`.
#[derive(Debug, Default)]
pub struct TimelinePage {
    pub tweets: Vec<Tweet>,
    pub authors: Vec<TweetAuthor>,
}

impl TimelineClient {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self {
            http,
            base_url,
            user_ids: Arc::new(DashMap::new()),
        }
    }

    /// Fetch the most recent tweets for `username`.
    pub async fn fetch_timeline(
        &self,
        access_token: &str,
        username: &str,
        max_tweets: u32,
    ) -> Result<TimelinePage, AppError> {
        let user_id = self.resolve_user_id(access_token, username).await?;

        let url = format!("{}/users/{}/tweets", self.base_url, user_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                (
                    "max_results",
                    max_tweets.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE).to_string(),
                ),
                (
                    "tweet.fields",
                    "created_at,author_id,text,public_metrics".to_string(),
                ),
                ("expansions", "author_id".to_string()),
                ("user.fields", "username,name".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        let envelope: TimelineEnvelope = self.check_response_json(response).await?;
        Ok(TimelinePage {
            tweets: envelope.data,
            authors: envelope.includes.users,
        })
    }

    /// Resolve a username to its user id, caching the result.
    async fn resolve_user_id(
        &self,
        access_token: &str,
        username: &str,
    ) -> Result<String, AppError> {
        if let Some(cached) = self.user_ids.get(username) {
            return Ok(cached.value().clone());
        }

        let url = format!("{}/users/by/username/{}", self.base_url, username);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        // An unknown username comes back as 200 with no data object.
        let envelope: UserEnvelope = self.check_response_json(response).await?;
        let user = envelope
            .data
            .ok_or_else(|| AppError::Upstream(format!("No such user: {}", username)))?;

        self.user_ids
            .insert(username.to_string(), user.id.clone());
        Ok(user.id)
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// POST {base}/oauth2/token
    /// Authorization: Basic {client_id}:{client_secret}
    ///
    /// The server may rotate the refresh token; the response then carries
    /// the replacement.
    pub async fn refresh_token(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, AppError> {
        let url = format!("{}/oauth2/token", self.base_url);
        let response = self
            .http
            .post(&url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| AppError::TokenRefresh(format!("Token refresh request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            // OAuth failures carry {"error": ..., "error_description": ...}.
            if let Ok(oauth) = serde_json::from_str::<OAuthErrorBody>(&body) {
                return Err(AppError::TokenRefresh(oauth.into_message()));
            }
            return Err(AppError::TokenRefresh(format!("HTTP {}: {}", status, body)));
        }

        serde_json::from_str(&body)
            .map_err(|e| AppError::TokenRefresh(format!("JSON parse error: {}", e)))
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            // Rate limit - the cycle treats this as an empty poll
            if status.as_u16() == 429 {
                tracing::warn!("X rate limit hit (429)");
                return Err(AppError::RateLimited);
            }

            // Unauthorized - token may have been revoked or rotated away
            if status.as_u16() == 401 {
                return Err(AppError::Unauthorized);
            }

            return Err(AppError::Upstream(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("JSON parse error: {}", e)))
    }
}

/// Token refresh response from the OAuth endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl OAuthErrorBody {
    fn into_message(self) -> String {
        self.error_description.unwrap_or(self.error)
    }
}

/// Timeline endpoint envelope. `data` is absent entirely when the window
/// holds no tweets.
#[derive(Debug, Default, Deserialize)]
struct TimelineEnvelope {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    includes: TimelineIncludes,
}

#[derive(Debug, Default, Deserialize)]
struct TimelineIncludes {
    #[serde(default)]
    users: Vec<TweetAuthor>,
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    #[serde(default)]
    data: Option<ResolvedUser>,
}

#[derive(Debug, Deserialize)]
struct ResolvedUser {
    id: String,
}
