// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Notification Consumer
//!
//! Background task that turns order events into customer notifications.
//!
//! ## Strategy
//!
//! The consumer drains the `order-placed` queue whenever it is woken by a
//! publish, and otherwise every `poll_interval` (default 5 s). Each message is
//! leased while it is processed:
//!
//! 1. Decode the event. A message that cannot be decoded will never succeed,
//!    so it goes to the dead-letter queue.
//! 2. Persist a notification for the ordering customer.
//! 3. Acknowledge. If persisting failed the lease is released instead and the
//!    queue redelivers the message. The consumer then waits a full
//!    `poll_interval` before trying again, whatever gets published meanwhile.
//!
//! Processing is not idempotent: a redelivered event produces a second
//! notification.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`, like every other background
//! task in the binary.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::models::Notification;
use crate::pipeline::{OrderEvent, ORDER_QUEUE};
use crate::queue::{Delivery, DurableQueue, QueueError};
use crate::storage::{NotificationRepository, RecordStore, StorageError};

/// Default interval between queue sweeps when no publish wakes the consumer.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How long a message stays invisible to other consumers while processed.
const DEFAULT_LEASE: Duration = Duration::from_secs(30);

/// Where notifications are persisted.
pub trait NotificationStore: Send + Sync {
    fn save_notification(
        &self,
        recipient_id: u64,
        message: &str,
    ) -> Result<Notification, StorageError>;
}

impl NotificationStore for RecordStore {
    fn save_notification(
        &self,
        recipient_id: u64,
        message: &str,
    ) -> Result<Notification, StorageError> {
        NotificationRepository::new(self).create(recipient_id, message)
    }
}

/// Message shown to the customer for a placed order.
pub fn notification_message(event: &OrderEvent) -> String {
    format!("Your order has been placed: {}", event.description)
}

#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("undecodable order event: {0}")]
    Decode(serde_json::Error),

    #[error("failed to persist notification: {0}")]
    Persist(StorageError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// What happened to one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    Notified(u64),
    DeadLettered,
    Released,
}

pub struct NotificationConsumer {
    queue: DurableQueue,
    store: Arc<dyn NotificationStore>,
    queue_name: String,
    poll_interval: Duration,
    lease: Duration,
}

impl NotificationConsumer {
    pub fn new(queue: DurableQueue, store: Arc<dyn NotificationStore>) -> Self {
        Self {
            queue,
            store,
            queue_name: ORDER_QUEUE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            lease: DEFAULT_LEASE,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(consumer.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            queue = %self.queue_name,
            interval_secs = self.poll_interval.as_secs(),
            "Notification consumer starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Notification consumer shutting down");
                return;
            }

            let back_off = match self.drain_until_release() {
                Ok((_, released)) => released,
                Err(e) => {
                    error!(error = %e, "Notification consumer: queue error");
                    true
                }
            };

            // After a failure only the interval brings the consumer back, so
            // new publishes cannot turn a broken store into a retry loop
            if back_off {
                tokio::select! {
                    _ = tokio::time::sleep(self.poll_interval) => {},
                    _ = shutdown.cancelled() => {
                        info!("Notification consumer shutting down");
                        return;
                    }
                }
                continue;
            }

            tokio::select! {
                _ = self.queue.wait_for_publish() => {},
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Notification consumer shutting down");
                    return;
                }
            }
        }
    }

    /// Process every currently visible message. Returns how many were handled.
    ///
    /// Stops early when a message is released.
    pub fn drain(&self) -> Result<usize, ConsumerError> {
        self.drain_until_release().map(|(handled, _)| handled)
    }

    /// Returns the number handled and whether the last one was released.
    fn drain_until_release(&self) -> Result<(usize, bool), ConsumerError> {
        let mut handled = 0;
        let mut released = false;
        while let Some(delivery) = self.queue.receive(&self.queue_name, self.lease)? {
            handled += 1;
            if self.process(&delivery)? == Processed::Released {
                released = true;
                break;
            }
        }
        if handled > 0 {
            debug!(handled, released, "Notification consumer: drained queue");
        }
        Ok((handled, released))
    }

    /// Handle one delivery and settle it with the queue.
    pub fn process(&self, delivery: &Delivery) -> Result<Processed, ConsumerError> {
        let event: OrderEvent = match delivery.decode() {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    message_id = %delivery.message_id,
                    error = %ConsumerError::Decode(e),
                    "Notification consumer: dead-lettering message"
                );
                self.queue.dead_letter(delivery)?;
                return Ok(Processed::DeadLettered);
            }
        };

        let message = notification_message(&event);
        let notification = match self.store.save_notification(event.customer_id, &message) {
            Ok(notification) => notification,
            Err(e) => {
                warn!(
                    order_id = event.id,
                    attempt = delivery.attempt,
                    error = %ConsumerError::Persist(e),
                    "Notification consumer: releasing message for redelivery"
                );
                self.queue.release(delivery)?;
                return Ok(Processed::Released);
            }
        };

        if let Err(e) = self.queue.ack(delivery) {
            // The notification exists; the message will come back after the lease
            warn!(
                order_id = event.id,
                notification_id = notification.id,
                error = %e,
                "Notification consumer: ack failed, message may be redelivered"
            );
        }

        info!(
            order_id = event.id,
            recipient_id = notification.recipient_id,
            notification_id = notification.id,
            attempt = delivery.attempt,
            "Notification created"
        );
        Ok(Processed::Notified(notification.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Order, OrderStatus};
    use crate::queue::dead_letter_queue;
    use crate::storage::NOTIFICATIONS;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct Fixture {
        queue: DurableQueue,
        store: RecordStore,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        Fixture {
            queue: DurableQueue::open(&dir.path().join("queue.redb")).unwrap(),
            store: RecordStore::open(&dir.path().join("notifications.redb"), &[NOTIFICATIONS])
                .unwrap(),
            _dir: dir,
        }
    }

    fn event(customer_id: u64, description: &str) -> OrderEvent {
        OrderEvent::from(&Order {
            id: 1,
            customer_id,
            restaurant_id: 3,
            description: description.into(),
            total_amount: None,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        })
    }

    /// Store that fails until switched on.
    struct FlakyStore {
        inner: RecordStore,
        healthy: AtomicBool,
    }

    impl NotificationStore for FlakyStore {
        fn save_notification(
            &self,
            recipient_id: u64,
            message: &str,
        ) -> Result<Notification, StorageError> {
            if !self.healthy.load(Ordering::SeqCst) {
                return Err(StorageError::Io(std::io::Error::other("unavailable")));
            }
            self.inner.save_notification(recipient_id, message)
        }
    }

    /// Store that always fails and counts attempts.
    #[derive(Default)]
    struct BrokenStore {
        attempts: AtomicUsize,
    }

    impl NotificationStore for BrokenStore {
        fn save_notification(
            &self,
            _recipient_id: u64,
            _message: &str,
        ) -> Result<Notification, StorageError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn event_becomes_notification_for_customer() {
        let f = fixture();
        f.queue.publish(ORDER_QUEUE, &event(7, "2x burger")).unwrap();

        let consumer = NotificationConsumer::new(f.queue.clone(), Arc::new(f.store.clone()));
        assert_eq!(consumer.drain().unwrap(), 1);

        let notifications = NotificationRepository::new(&f.store).list_by_recipient(7).unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].message, "Your order has been placed: 2x burger");
        assert!(!notifications[0].read);
        assert_eq!(f.queue.depth(ORDER_QUEUE).unwrap(), 0);
    }

    #[test]
    fn redelivery_duplicates_notification() {
        let f = fixture();
        f.queue.publish(ORDER_QUEUE, &event(7, "soup")).unwrap();
        let consumer = NotificationConsumer::new(f.queue.clone(), Arc::new(f.store.clone()));

        // Processed but not acked, then handed out again
        let delivery = f.queue.receive(ORDER_QUEUE, Duration::ZERO).unwrap().unwrap();
        f.store.save_notification(7, &notification_message(&event(7, "soup"))).unwrap();
        drop(delivery);
        assert_eq!(consumer.drain().unwrap(), 1);

        assert_eq!(NotificationRepository::new(&f.store).list_by_recipient(7).unwrap().len(), 2);
    }

    #[test]
    fn undecodable_message_is_dead_lettered() {
        let f = fixture();
        f.queue.publish(ORDER_QUEUE, &serde_json::json!({"unexpected": true})).unwrap();
        let consumer = NotificationConsumer::new(f.queue.clone(), Arc::new(f.store.clone()));

        assert_eq!(consumer.drain().unwrap(), 1);
        assert_eq!(f.queue.depth(ORDER_QUEUE).unwrap(), 0);
        assert_eq!(f.queue.depth(&dead_letter_queue(ORDER_QUEUE)).unwrap(), 1);
        assert!(NotificationRepository::new(&f.store).list_all().unwrap().is_empty());
    }

    #[test]
    fn persist_failure_releases_for_redelivery() {
        let f = fixture();
        f.queue.publish(ORDER_QUEUE, &event(7, "tacos")).unwrap();
        let flaky = Arc::new(FlakyStore {
            inner: f.store.clone(),
            healthy: AtomicBool::new(false),
        });
        let consumer = NotificationConsumer::new(f.queue.clone(), flaky.clone());

        assert_eq!(consumer.drain().unwrap(), 1);
        assert_eq!(f.queue.depth(ORDER_QUEUE).unwrap(), 1);

        flaky.healthy.store(true, Ordering::SeqCst);
        assert_eq!(consumer.drain().unwrap(), 1);
        assert_eq!(f.queue.depth(ORDER_QUEUE).unwrap(), 0);
        assert_eq!(NotificationRepository::new(&f.store).list_by_recipient(7).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failing_store_is_retried_once_per_interval() {
        let f = fixture();
        f.queue.publish(ORDER_QUEUE, &event(7, "ramen")).unwrap();
        let store = Arc::new(BrokenStore::default());
        let consumer = NotificationConsumer::new(f.queue.clone(), store.clone())
            .with_poll_interval(Duration::from_secs(5));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(consumer.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(300)).await;
        // Publishes during the back-off must not trigger extra attempts
        f.queue.publish(ORDER_QUEUE, &event(8, "udon")).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();

        assert_eq!(store.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(f.queue.depth(ORDER_QUEUE).unwrap(), 2);
    }

    #[tokio::test]
    async fn run_stops_on_cancellation() {
        let f = fixture();
        let consumer = NotificationConsumer::new(f.queue.clone(), Arc::new(f.store.clone()))
            .with_poll_interval(Duration::from_millis(10));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(consumer.run(shutdown.clone()));

        f.queue.publish(ORDER_QUEUE, &event(9, "pho")).unwrap();
        for _ in 0..200 {
            if f.queue.depth(ORDER_QUEUE).unwrap() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();

        assert_eq!(NotificationRepository::new(&f.store).list_by_recipient(9).unwrap().len(), 1);
    }
}
