// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Order Placement Pipeline
//!
//! Placing an order publishes an [`OrderEvent`] to the `order-placed` queue and
//! then persists the order. The notification service consumes the queue on
//! its own schedule (see [`crate::notifier`]).
//!
//! ## Delivery Semantics
//!
//! The two steps are not atomic and nothing compensates a failure between
//! them:
//!
//! - publish fails → nothing persisted, caller sees 500
//! - publish succeeds, persist fails → event delivered for an order that does
//!   not exist, caller sees 500
//! - the queue delivers at least once, so a notification may be duplicated

pub mod events;
pub mod producer;

pub use events::OrderEvent;
pub use producer::{EventPublisher, OrderError, OrderPipeline, OrderStore, QueuePublisher};

/// Queue carrying order placement events.
pub const ORDER_QUEUE: &str = "order-placed";
