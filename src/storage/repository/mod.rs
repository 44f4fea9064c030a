// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the record stores.
//!
//! Each repository borrows the `RecordStore` of the service that owns the
//! entity and exposes the lookups that service needs.

pub mod notifications;
pub mod orders;
pub mod principals;
pub mod restaurants;

pub use notifications::{NotificationRepository, NOTIFICATIONS};
pub use orders::{OrderRepository, ORDERS};
pub use principals::{PrincipalRepository, StoredPrincipal, PRINCIPALS};
pub use restaurants::{RestaurantRepository, RESTAURANTS};
