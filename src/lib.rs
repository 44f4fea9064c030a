// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Food Platform - gateway and internal services for a food-ordering system.
//!
//! A bearer token is verified once, at the gateway, and turned into a set of
//! trusted `X-User-*` headers. Internal services build the caller's identity
//! from those headers and authorize each route against an explicit policy.
//! Order placement publishes an event to a durable queue that the
//! notification consumer drains.
//!
//! ## Modules
//!
//! - `api` - internal service routers and handlers (Axum)
//! - `auth` - token issuance and verification, header trust, authorization
//! - `gateway` - edge verification and prefix proxying
//! - `pipeline` - order creation and event publishing
//! - `notifier` - order event consumer
//! - `queue` - durable at-least-once queue (redb)
//! - `storage` - per-service record stores (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod notifier;
pub mod pipeline;
pub mod queue;
pub mod state;
pub mod storage;
