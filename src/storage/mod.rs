// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent records for every service, kept in embedded redb databases.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   auth.redb            # principals
//!   orders.redb          # orders
//!   restaurants.redb     # restaurants
//!   notifications.redb   # notifications
//!   queue.redb           # message queue (see crate::queue)
//! ```
//!
//! Each service only ever opens its own file.

pub mod record_store;
pub mod repository;

pub use record_store::{RecordStore, RecordTable, StorageError, StorageResult};
pub use repository::{
    NotificationRepository, OrderRepository, PrincipalRepository, RestaurantRepository,
    StoredPrincipal, NOTIFICATIONS, ORDERS, PRINCIPALS, RESTAURANTS,
};
