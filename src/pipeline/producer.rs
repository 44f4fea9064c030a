// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Order pipeline producer: validate, publish, persist.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::events::OrderEvent;
use super::ORDER_QUEUE;
use crate::auth::{AuthError, RequestIdentity};
use crate::models::{Order, OrderRequest, OrderStatus};
use crate::queue::{DurableQueue, QueueError};
use crate::storage::{OrderRepository, RecordStore, StorageError};

/// Outbound side of the pipeline.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &OrderEvent) -> Result<Uuid, QueueError>;
}

/// Publishes order events to a [`DurableQueue`].
#[derive(Clone)]
pub struct QueuePublisher {
    queue: DurableQueue,
    queue_name: String,
}

impl QueuePublisher {
    pub fn new(queue: DurableQueue) -> Self {
        Self {
            queue,
            queue_name: ORDER_QUEUE.to_string(),
        }
    }
}

impl EventPublisher for QueuePublisher {
    fn publish(&self, event: &OrderEvent) -> Result<Uuid, QueueError> {
        self.queue.publish(&self.queue_name, event)
    }
}

/// Where orders are persisted.
pub trait OrderStore: Send + Sync {
    fn allocate_order_id(&self) -> Result<u64, StorageError>;
    fn save_order(&self, order: &Order) -> Result<(), StorageError>;
}

impl OrderStore for RecordStore {
    fn allocate_order_id(&self) -> Result<u64, StorageError> {
        OrderRepository::new(self).allocate_id()
    }

    fn save_order(&self, order: &Order) -> Result<(), StorageError> {
        OrderRepository::new(self).insert(order)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Identity(AuthError),

    #[error("failed to allocate order id: {0}")]
    Allocate(StorageError),

    #[error("failed to publish order event: {0}")]
    Publish(QueueError),

    #[error("failed to persist order: {0}")]
    Persist(StorageError),
}

#[derive(Clone)]
pub struct OrderPipeline {
    publisher: Arc<dyn EventPublisher>,
    store: Arc<dyn OrderStore>,
}

impl OrderPipeline {
    pub fn new(publisher: Arc<dyn EventPublisher>, store: Arc<dyn OrderStore>) -> Self {
        Self { publisher, store }
    }

    /// Place an order for the calling identity.
    ///
    /// The customer is always the caller. Validation happens before any side
    /// effect; after that the event is published and then the order saved.
    pub fn create_order(
        &self,
        request: OrderRequest,
        identity: &RequestIdentity,
    ) -> Result<Order, OrderError> {
        let (restaurant_id, description, total_amount) = validate(request)?;
        let customer_id = identity.subject_id().map_err(OrderError::Identity)?;

        let id = self.store.allocate_order_id().map_err(OrderError::Allocate)?;
        let order = Order {
            id,
            customer_id,
            restaurant_id,
            description,
            total_amount,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };

        let message_id = self
            .publisher
            .publish(&OrderEvent::from(&order))
            .map_err(|e| {
                tracing::error!(order_id = id, error = %e, "Order event publish failed");
                OrderError::Publish(e)
            })?;

        if let Err(e) = self.store.save_order(&order) {
            tracing::warn!(
                order_id = id,
                %message_id,
                error = %e,
                "Order event published but order not persisted"
            );
            return Err(OrderError::Persist(e));
        }

        tracing::info!(
            order_id = id,
            customer_id,
            restaurant_id,
            %message_id,
            "Order placed"
        );
        Ok(order)
    }
}

fn validate(request: OrderRequest) -> Result<(u64, String, Option<f64>), OrderError> {
    let restaurant_id = request
        .restaurant_id
        .ok_or_else(|| OrderError::Validation("restaurantId is required".into()))?;

    let description = request
        .description
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| OrderError::Validation("description is required".into()))?;

    if let Some(amount) = request.total_amount {
        if !amount.is_finite() || amount < 0.0 {
            return Err(OrderError::Validation(
                "totalAmount must be a non-negative number".into(),
            ));
        }
    }

    Ok((restaurant_id, description, request.total_amount))
}
