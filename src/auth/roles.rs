// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Prefix that turns a role name into an authority string.
pub const AUTHORITY_PREFIX: &str = "ROLE_";

/// User roles for authorization.
///
/// ## Roles
///
/// - `Admin` - Platform administrator; exempt from ownership checks
/// - `RestaurantOwner` - Manages the restaurants they own
/// - `Customer` - Places orders and receives notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Full administrative access
    Admin,
    /// Owner of one or more restaurants
    RestaurantOwner,
    /// Ordering customer
    Customer,
}

impl Role {
    /// Wire name, as carried in tokens and identity headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::RestaurantOwner => "RESTAURANT_OWNER",
            Role::Customer => "CUSTOMER",
        }
    }

    /// Authority string granted to callers with this role (`ROLE_<NAME>`).
    pub fn authority(&self) -> String {
        format!("{AUTHORITY_PREFIX}{}", self.as_str())
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
