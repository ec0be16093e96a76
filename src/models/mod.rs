// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod credential;
pub mod poll_run;
pub mod settings;
pub mod target;
pub mod tweet;

pub use credential::Credential;
pub use poll_run::{PollRun, PollStatus};
pub use settings::{CommitPolicy, Settings};
pub use target::{DeliveryMode, DeliveryPolicy, MonitoredTarget};
pub use tweet::{PublicMetrics, Tweet, TweetAuthor};
