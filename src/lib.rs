// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Timeline-Relay: poll X timelines and relay new tweets downstream
//!
//! This crate polls the timelines of monitored accounts, filters out
//! tweets it has already delivered, formats the remainder into a digest,
//! and hands it to a webhook or local command.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use services::{Poller, Scheduler};
use store::Store;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub poller: Arc<Poller>,
    pub scheduler: Scheduler,
}
