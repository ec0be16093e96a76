// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Poll scheduling.
//!
//! One timer drives periodic sweeps over the monitored targets. Changing
//! the interval cancels the old timer before spawning its replacement, so
//! there is never more than one ticking. Manual sweeps go straight to the
//! [`Poller`](crate::services::Poller) and do not disturb the timer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::services::poller::Poller;

struct TimerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the periodic poll timer.
#[derive(Clone)]
pub struct Scheduler {
    poller: Arc<Poller>,
    /// Parent token; cancelling it stops the timer too.
    shutdown: CancellationToken,
    timer: Arc<Mutex<Option<TimerHandle>>>,
}

impl Scheduler {
    pub fn new(poller: Arc<Poller>, shutdown: CancellationToken) -> Self {
        Self {
            poller,
            shutdown,
            timer: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the poll timer, replacing any running one.
    ///
    /// The first sweep happens one full interval after this call; callers
    /// that want an immediate sweep trigger the poller directly.
    pub async fn start(&self, interval_minutes: u32) {
        self.start_with_period(Duration::from_secs(u64::from(interval_minutes) * 60))
            .await;
        tracing::info!(interval_minutes, "Poll timer started");
    }

    /// `start` with a raw period. Sub-minute periods only make sense in
    /// tests.
    pub async fn start_with_period(&self, period: Duration) {
        let mut slot = self.timer.lock().await;

        // Cancel the previous timer before spawning the next one. A sweep
        // it already started finishes on its own; the per-target guards
        // keep the replacement from doubling up on it.
        if let Some(prev) = slot.take() {
            prev.cancel.cancel();
        }

        let cancel = self.shutdown.child_token();
        let poller = Arc::clone(&self.poller);
        let timer_token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately; consume it so the
            // first sweep waits a full period.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let sweep = poller.run_all().await;
                        if !sweep.skipped.is_empty() {
                            tracing::debug!(
                                skipped = sweep.skipped.len(),
                                "Sweep skipped busy targets"
                            );
                        }
                    }
                    _ = timer_token.cancelled() => break,
                }
            }
        });

        *slot = Some(TimerHandle { cancel, task });
    }

    /// Stop the timer. Waits for a sweep in flight to finish.
    pub async fn shutdown(&self) {
        let handle = self.timer.lock().await.take();
        if let Some(TimerHandle { cancel, task }) = handle {
            cancel.cancel();
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Poll timer task ended abnormally");
            }
            tracing::info!("Poll timer stopped");
        }
    }
}
