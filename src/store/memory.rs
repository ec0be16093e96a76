//! In-memory state backing, used by tests and `STATE_BACKEND=memory`.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::{Credential, MonitoredTarget, PollRun, Settings};
use crate::store::{RetentionPolicy, StateDocument, Store};

/// Volatile [`Store`]. Starts empty and forgets everything on drop.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<StateDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_credential(&self) -> Result<Option<Credential>, AppError> {
        Ok(self.state.read().await.credential.clone())
    }

    async fn put_credential(&self, credential: &Credential) -> Result<(), AppError> {
        self.state.write().await.credential = Some(credential.clone());
        Ok(())
    }

    async fn get_settings(&self) -> Result<Settings, AppError> {
        Ok(self.state.read().await.settings.clone())
    }

    async fn put_settings(&self, settings: &Settings) -> Result<(), AppError> {
        self.state.write().await.settings = settings.clone();
        Ok(())
    }

    async fn list_targets(&self) -> Result<Vec<MonitoredTarget>, AppError> {
        Ok(self.state.read().await.targets.clone())
    }

    async fn get_target(&self, identity: &str) -> Result<Option<MonitoredTarget>, AppError> {
        Ok(self.state.read().await.target(identity).cloned())
    }

    async fn upsert_target(&self, target: &MonitoredTarget) -> Result<(), AppError> {
        self.state.write().await.upsert_target(target.clone());
        Ok(())
    }

    async fn remove_target(&self, identity: &str) -> Result<bool, AppError> {
        Ok(self.state.write().await.remove_target(identity))
    }

    async fn seen_subset(&self, ids: &[String]) -> Result<HashSet<String>, AppError> {
        Ok(self.state.read().await.seen_subset(ids))
    }

    async fn commit_seen(
        &self,
        ids: &[String],
        observed_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.state.write().await.commit_seen(ids, observed_at);
        Ok(())
    }

    async fn evict_seen(&self, policy: RetentionPolicy) -> Result<usize, AppError> {
        Ok(self.state.write().await.evict_seen(policy, Utc::now()))
    }

    async fn seen_count(&self) -> Result<usize, AppError> {
        Ok(self.state.read().await.seen.len())
    }

    async fn append_poll_run(&self, run: &PollRun) -> Result<(), AppError> {
        self.state.write().await.append_poll_run(run.clone());
        Ok(())
    }

    async fn recent_poll_runs(&self, limit: usize) -> Result<Vec<PollRun>, AppError> {
        Ok(self.state.read().await.recent_poll_runs(limit))
    }
}
