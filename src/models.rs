// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response data structures shared by the services. All types
//! derive `Serialize`, `Deserialize`, and `ToSchema` for JSON handling and
//! OpenAPI documentation. Field names are camelCase on the wire.
//!
//! ## Model Categories
//!
//! - **Auth**: sign-in request and response
//! - **Orders**: placed orders and the order creation payload
//! - **Restaurants**: restaurants and their owners
//! - **Notifications**: per-customer messages produced from order events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;

// =============================================================================
// Auth Models
// =============================================================================

/// Credentials submitted to the sign-in endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Account email (case-insensitive).
    pub email: String,
    /// Plain-text password, compared against the stored hash.
    pub password: String,
}

/// Successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Signed bearer token to present to the gateway.
    pub token: String,
    pub user_id: u64,
    pub email: String,
    pub role: Role,
    pub full_name: String,
}

// =============================================================================
// Order Models
// =============================================================================

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Placed, not yet accepted by the restaurant.
    #[default]
    Pending,
    Confirmed,
    Delivered,
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "PENDING"),
            OrderStatus::Confirmed => write!(f, "CONFIRMED"),
            OrderStatus::Delivered => write!(f, "DELIVERED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: u64,
    /// Always the authenticated caller; never taken from the request body.
    pub customer_id: u64,
    pub restaurant_id: u64,
    pub description: String,
    #[serde(default)]
    pub total_amount: Option<f64>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Payload accepted by the order creation endpoint.
///
/// Unknown fields (including any `customerId`) are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(default)]
    pub restaurant_id: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub total_amount: Option<f64>,
}

// =============================================================================
// Restaurant Models
// =============================================================================

/// A restaurant and the user that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Restaurant {
    pub id: u64,
    pub name: String,
    /// User id of the owner.
    pub owner: u64,
}

/// Create/update payload for restaurants. The owner comes from the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RestaurantRequest {
    pub name: String,
}

// =============================================================================
// Notification Models
// =============================================================================

/// A message for a customer, created from an order event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: u64,
    pub recipient_id: u64,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_request_ignores_client_supplied_customer_id() {
        let request: OrderRequest = serde_json::from_str(
            r#"{"restaurantId":3,"description":"2x burger","totalAmount":15.5,"customerId":999}"#,
        )
        .unwrap();
        assert_eq!(request.restaurant_id, Some(3));
        assert_eq!(request.description.as_deref(), Some("2x burger"));
        assert_eq!(request.total_amount, Some(15.5));
    }

    #[test]
    fn order_serializes_camel_case_with_status() {
        let order = Order {
            id: 1,
            customer_id: 7,
            restaurant_id: 3,
            description: "soup".into(),
            total_amount: None,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["customerId"], 7);
        assert_eq!(json["restaurantId"], 3);
        assert_eq!(json["status"], "PENDING");
        assert!(json["totalAmount"].is_null());
    }
}
