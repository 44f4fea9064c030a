// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Order;

/// Snapshot of an order at creation time, as published to the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub id: u64,
    pub customer_id: u64,
    pub restaurant_id: u64,
    pub description: String,
    #[serde(default)]
    pub total_amount: Option<f64>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderEvent {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            customer_id: order.customer_id,
            restaurant_id: order.restaurant_id,
            description: order.description.clone(),
            total_amount: order.total_amount,
            status: order.status.to_string(),
            created_at: order.created_at,
        }
    }
}
