// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON-file state backing.
//!
//! The whole [`StateDocument`] is rewritten on every mutation: serialize to
//! a sibling `.tmp` file, then rename over the real path. A crash mid-write
//! leaves the previous document intact. Mutations run against a clone and
//! only replace the in-memory document after the file write succeeds, so a
//! persistence failure never leaves memory and disk disagreeing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::{Credential, MonitoredTarget, PollRun, Settings};
use crate::store::{RetentionPolicy, StateDocument, Store};

/// [`Store`] persisted to a single JSON file.
pub struct FileStore {
    path: PathBuf,
    state: RwLock<StateDocument>,
    created: bool,
}

impl FileStore {
    /// Load state from `path`, starting from an empty document if the file
    /// does not exist yet. A file that exists but fails to parse is an
    /// error; silently resetting it would re-deliver every known tweet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let doc: StateDocument = serde_json::from_slice(&bytes).map_err(|e| {
                    AppError::Store(format!("Corrupt state file {}: {}", path.display(), e))
                })?;
                Ok(Self {
                    path,
                    state: RwLock::new(doc),
                    created: false,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self {
                path,
                state: RwLock::new(StateDocument::default()),
                created: true,
            }),
            Err(e) => Err(AppError::Store(format!(
                "Failed to read state file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// True when `open` found no existing file. Seeding from environment
    /// variables only happens for fresh stores, never over live state.
    pub fn is_fresh(&self) -> bool {
        self.created
    }

    async fn persist(path: &Path, doc: &StateDocument) -> Result<(), AppError> {
        let bytes = serde_json::to_vec_pretty(doc)
            .map_err(|e| AppError::Store(format!("Failed to serialize state: {}", e)))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::Store(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await.map_err(|e| {
            AppError::Store(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, path).await.map_err(|e| {
            AppError::Store(format!("Failed to replace {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    /// Apply `mutate` to a copy of the document, persist the copy, and only
    /// then swap it in. Holds the write lock across the file write so
    /// concurrent mutations serialize.
    async fn update<F, R>(&self, mutate: F) -> Result<R, AppError>
    where
        F: FnOnce(&mut StateDocument) -> R,
    {
        let mut guard = self.state.write().await;
        let mut draft = guard.clone();
        let out = mutate(&mut draft);
        Self::persist(&self.path, &draft).await?;
        *guard = draft;
        Ok(out)
    }
}

#[async_trait]
impl Store for FileStore {
    async fn get_credential(&self) -> Result<Option<Credential>, AppError> {
        Ok(self.state.read().await.credential.clone())
    }

    async fn put_credential(&self, credential: &Credential) -> Result<(), AppError> {
        self.update(|doc| doc.credential = Some(credential.clone()))
            .await
    }

    async fn get_settings(&self) -> Result<Settings, AppError> {
        Ok(self.state.read().await.settings.clone())
    }

    async fn put_settings(&self, settings: &Settings) -> Result<(), AppError> {
        self.update(|doc| doc.settings = settings.clone()).await
    }

    async fn list_targets(&self) -> Result<Vec<MonitoredTarget>, AppError> {
        Ok(self.state.read().await.targets.clone())
    }

    async fn get_target(&self, identity: &str) -> Result<Option<MonitoredTarget>, AppError> {
        Ok(self.state.read().await.target(identity).cloned())
    }

    async fn upsert_target(&self, target: &MonitoredTarget) -> Result<(), AppError> {
        self.update(|doc| doc.upsert_target(target.clone())).await
    }

    async fn remove_target(&self, identity: &str) -> Result<bool, AppError> {
        self.update(|doc| doc.remove_target(identity)).await
    }

    async fn seen_subset(&self, ids: &[String]) -> Result<HashSet<String>, AppError> {
        Ok(self.state.read().await.seen_subset(ids))
    }

    async fn commit_seen(
        &self,
        ids: &[String],
        observed_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.update(|doc| doc.commit_seen(ids, observed_at)).await
    }

    async fn evict_seen(&self, policy: RetentionPolicy) -> Result<usize, AppError> {
        self.update(|doc| doc.evict_seen(policy, Utc::now())).await
    }

    async fn seen_count(&self) -> Result<usize, AppError> {
        Ok(self.state.read().await.seen.len())
    }

    async fn append_poll_run(&self, run: &PollRun) -> Result<(), AppError> {
        self.update(|doc| doc.append_poll_run(run.clone())).await
    }

    async fn recent_poll_runs(&self, limit: usize) -> Result<Vec<PollRun>, AppError> {
        Ok(self.state.read().await.recent_poll_runs(limit))
    }
}
