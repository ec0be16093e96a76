// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - polling, delivery, and token plumbing.

pub mod digest;
pub mod dispatch;
pub mod poller;
pub mod scheduler;
pub mod timeline;
pub mod token;

pub use dispatch::{DeliveryResult, DeliveryTarget, Dispatcher, EventPayload};
pub use poller::{Poller, SweepResult};
pub use scheduler::Scheduler;
pub use timeline::{TimelineClient, TimelinePage};
pub use token::TokenManager;
