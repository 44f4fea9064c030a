// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Durable Message Queue
//!
//! A small at-least-once queue stored in redb, shared by the order service
//! (producer) and the notification service (consumer).
//!
//! ## Delivery Model
//!
//! - `publish` appends an envelope under the next sequence number of a queue.
//! - `receive` hands out the oldest message that is not currently leased and
//!   leases it for the given duration. A message whose lease runs out without
//!   an `ack` is handed out again.
//! - `release` drops a lease early so the message is redelivered on the next
//!   `receive`; `dead_letter` moves it to `<queue>.dlq`.
//!
//! There is no deduplication. Consumers must tolerate seeing a message twice.
//!
//! ## Table Layout
//!
//! - `queue_messages`: (queue, sequence) → envelope JSON
//! - `queue_leases`: (queue, sequence) → leased-until (unix millis)
//! - `queue_sequences`: queue → last sequence

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Notify;
use uuid::Uuid;

const MESSAGES: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("queue_messages");
const LEASES: TableDefinition<(&str, u64), i64> = TableDefinition::new("queue_leases");
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("queue_sequences");

/// Suffix appended to a queue name to form its dead-letter queue.
pub const DEAD_LETTER_SUFFIX: &str = ".dlq";

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("message {sequence} not found in queue {queue}")]
    NotFound { queue: String, sequence: u64 },
}

pub type QueueResult<T> = Result<T, QueueError>;

/// What is stored per message.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    message_id: Uuid,
    published_at: DateTime<Utc>,
    deliveries: u32,
    payload: serde_json::Value,
}

/// A leased message handed to a consumer.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub queue: String,
    pub sequence: u64,
    pub message_id: Uuid,
    /// 1 on first delivery, incremented on every redelivery.
    pub attempt: u32,
    pub published_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl Delivery {
    /// Decode the payload into a typed message.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

/// Handle to the queue database. Cloning shares the database and the
/// publish signal.
#[derive(Clone)]
pub struct DurableQueue {
    db: Arc<Database>,
    published: Arc<Notify>,
}

impl DurableQueue {
    pub fn open(path: &Path) -> QueueResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(MESSAGES)?;
            let _ = write_txn.open_table(LEASES)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            published: Arc::new(Notify::new()),
        })
    }

    /// Durably append `payload` to `queue`. Returns the message id.
    pub fn publish<T: Serialize>(&self, queue: &str, payload: &T) -> QueueResult<Uuid> {
        let envelope = Envelope {
            message_id: Uuid::new_v4(),
            published_at: Utc::now(),
            deliveries: 0,
            payload: serde_json::to_value(payload)?,
        };

        let write_txn = self.db.begin_write()?;
        append(&write_txn, queue, &envelope)?;
        write_txn.commit()?;

        tracing::debug!(queue, message_id = %envelope.message_id, "Message published");
        self.published.notify_one();
        Ok(envelope.message_id)
    }

    /// Lease the oldest visible message of `queue`, if any.
    ///
    /// A zero lease makes the message immediately visible again unless it is
    /// acknowledged.
    pub fn receive(&self, queue: &str, lease: Duration) -> QueueResult<Option<Delivery>> {
        let now = Utc::now().timestamp_millis();
        let lease_ms = i64::try_from(lease.as_millis()).unwrap_or(i64::MAX);

        let write_txn = self.db.begin_write()?;
        let delivery = {
            let mut messages = write_txn.open_table(MESSAGES)?;
            let mut leases = write_txn.open_table(LEASES)?;

            let mut candidate = None;
            for entry in messages.range((queue, 0u64)..=(queue, u64::MAX))? {
                let (key, value) = entry?;
                let (_, sequence) = key.value();
                let leased_until = leases.get((queue, sequence))?.map(|v| v.value());
                if leased_until.is_some_and(|until| until > now) {
                    continue;
                }
                let envelope: Envelope = serde_json::from_slice(value.value())?;
                candidate = Some((sequence, envelope));
                break;
            }

            match candidate {
                Some((sequence, mut envelope)) => {
                    envelope.deliveries += 1;
                    let json = serde_json::to_vec(&envelope)?;
                    messages.insert((queue, sequence), json.as_slice())?;
                    leases.insert((queue, sequence), now.saturating_add(lease_ms))?;

                    Some(Delivery {
                        queue: queue.to_string(),
                        sequence,
                        message_id: envelope.message_id,
                        attempt: envelope.deliveries,
                        published_at: envelope.published_at,
                        payload: envelope.payload,
                    })
                }
                None => None,
            }
        };
        write_txn.commit()?;
        Ok(delivery)
    }

    /// Remove a delivered message for good.
    pub fn ack(&self, delivery: &Delivery) -> QueueResult<()> {
        let key = (delivery.queue.as_str(), delivery.sequence);
        let write_txn = self.db.begin_write()?;
        {
            let mut messages = write_txn.open_table(MESSAGES)?;
            let mut leases = write_txn.open_table(LEASES)?;
            leases.remove(key)?;
            if messages.remove(key)?.is_none() {
                return Err(QueueError::NotFound {
                    queue: delivery.queue.clone(),
                    sequence: delivery.sequence,
                });
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Drop the lease so the next `receive` hands the message out again.
    ///
    /// Does not wake waiters: a consumer that just gave up on a message
    /// should come back on its own schedule.
    pub fn release(&self, delivery: &Delivery) -> QueueResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut leases = write_txn.open_table(LEASES)?;
            leases.remove((delivery.queue.as_str(), delivery.sequence))?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Move a message to the dead-letter queue of its queue.
    pub fn dead_letter(&self, delivery: &Delivery) -> QueueResult<()> {
        let key = (delivery.queue.as_str(), delivery.sequence);
        let dlq = dead_letter_queue(&delivery.queue);

        let write_txn = self.db.begin_write()?;
        {
            let mut messages = write_txn.open_table(MESSAGES)?;
            let mut leases = write_txn.open_table(LEASES)?;
            leases.remove(key)?;
            let removed = messages.remove(key)?.map(|v| v.value().to_vec());
            let Some(bytes) = removed else {
                return Err(QueueError::NotFound {
                    queue: delivery.queue.clone(),
                    sequence: delivery.sequence,
                });
            };
            drop(messages);
            drop(leases);

            let envelope: Envelope = serde_json::from_slice(&bytes)?;
            append(&write_txn, &dlq, &envelope)?;
        }
        write_txn.commit()?;

        tracing::warn!(
            queue = %delivery.queue,
            message_id = %delivery.message_id,
            dead_letter_queue = %dlq,
            "Message moved to dead-letter queue"
        );
        Ok(())
    }

    /// Number of messages in `queue`, leased or not.
    pub fn depth(&self, queue: &str) -> QueueResult<u64> {
        let read_txn = self.db.begin_read()?;
        let messages = read_txn.open_table(MESSAGES)?;
        let mut count = 0;
        for entry in messages.range((queue, 0u64)..=(queue, u64::MAX))? {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    /// Resolve once something was published since the last wait.
    pub async fn wait_for_publish(&self) {
        self.published.notified().await;
    }
}

/// Name of the dead-letter queue paired with `queue`.
pub fn dead_letter_queue(queue: &str) -> String {
    format!("{queue}{DEAD_LETTER_SUFFIX}")
}

fn append(
    write_txn: &redb::WriteTransaction,
    queue: &str,
    envelope: &Envelope,
) -> QueueResult<u64> {
    let json = serde_json::to_vec(envelope)?;
    let mut sequences = write_txn.open_table(SEQUENCES)?;
    let sequence = sequences.get(queue)?.map(|v| v.value()).unwrap_or(0) + 1;
    sequences.insert(queue, sequence)?;

    let mut messages = write_txn.open_table(MESSAGES)?;
    messages.insert((queue, sequence), json.as_slice())?;
    Ok(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LONG_LEASE: Duration = Duration::from_secs(60);

    fn temp_queue() -> (DurableQueue, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let queue = DurableQueue::open(&dir.path().join("queue.redb")).unwrap();
        (queue, dir)
    }

    #[test]
    fn receive_returns_messages_in_publish_order() {
        let (queue, _dir) = temp_queue();
        queue.publish("q", &json!({"n": 1})).unwrap();
        queue.publish("q", &json!({"n": 2})).unwrap();

        let first = queue.receive("q", LONG_LEASE).unwrap().unwrap();
        let second = queue.receive("q", LONG_LEASE).unwrap().unwrap();
        assert_eq!(first.payload["n"], 1);
        assert_eq!(second.payload["n"], 2);
        assert!(queue.receive("q", LONG_LEASE).unwrap().is_none());
    }

    #[test]
    fn acked_message_is_gone() {
        let (queue, _dir) = temp_queue();
        queue.publish("q", &json!("hello")).unwrap();
        let delivery = queue.receive("q", Duration::ZERO).unwrap().unwrap();
        queue.ack(&delivery).unwrap();

        assert_eq!(queue.depth("q").unwrap(), 0);
        assert!(queue.receive("q", Duration::ZERO).unwrap().is_none());
        assert!(matches!(
            queue.ack(&delivery),
            Err(QueueError::NotFound { .. })
        ));
    }

    #[test]
    fn expired_lease_causes_redelivery() {
        let (queue, _dir) = temp_queue();
        let id = queue.publish("q", &json!("x")).unwrap();

        let first = queue.receive("q", Duration::ZERO).unwrap().unwrap();
        let again = queue.receive("q", Duration::ZERO).unwrap().unwrap();
        assert_eq!(first.message_id, id);
        assert_eq!(again.message_id, id);
        assert_eq!(first.attempt, 1);
        assert_eq!(again.attempt, 2);
    }

    #[test]
    fn release_makes_leased_message_visible() {
        let (queue, _dir) = temp_queue();
        queue.publish("q", &json!("x")).unwrap();

        let delivery = queue.receive("q", LONG_LEASE).unwrap().unwrap();
        assert!(queue.receive("q", LONG_LEASE).unwrap().is_none());

        queue.release(&delivery).unwrap();
        let redelivered = queue.receive("q", LONG_LEASE).unwrap().unwrap();
        assert_eq!(redelivered.sequence, delivery.sequence);
    }

    #[test]
    fn dead_letter_moves_message() {
        let (queue, _dir) = temp_queue();
        queue.publish("q", &json!("poison")).unwrap();
        let delivery = queue.receive("q", LONG_LEASE).unwrap().unwrap();
        queue.dead_letter(&delivery).unwrap();

        assert_eq!(queue.depth("q").unwrap(), 0);
        assert_eq!(queue.depth("q.dlq").unwrap(), 1);
        let dead = queue.receive("q.dlq", LONG_LEASE).unwrap().unwrap();
        assert_eq!(dead.message_id, delivery.message_id);
        assert_eq!(dead.payload, json!("poison"));
    }

    #[test]
    fn queues_are_isolated() {
        let (queue, _dir) = temp_queue();
        queue.publish("a", &json!(1)).unwrap();
        assert_eq!(queue.depth("a").unwrap(), 1);
        assert_eq!(queue.depth("b").unwrap(), 0);
        assert!(queue.receive("b", LONG_LEASE).unwrap().is_none());
    }

    #[test]
    fn decode_typed_payload() {
        #[derive(Deserialize)]
        struct Ping {
            n: u32,
        }
        let (queue, _dir) = temp_queue();
        queue.publish("q", &json!({"n": 5})).unwrap();
        let delivery = queue.receive("q", LONG_LEASE).unwrap().unwrap();
        assert_eq!(delivery.decode::<Ping>().unwrap().n, 5);
        assert!(delivery.decode::<Vec<u8>>().is_err());
    }

    #[tokio::test]
    async fn publish_wakes_waiter() {
        let (queue, _dir) = temp_queue();
        let waiter = queue.clone();
        let handle = tokio::spawn(async move { waiter.wait_for_publish().await });

        queue.publish("q", &json!(1)).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn release_does_not_wake_waiter() {
        let (queue, _dir) = temp_queue();
        queue.publish("q", &json!(1)).unwrap();
        // Consume the permit left by the publish
        queue.wait_for_publish().await;

        let delivery = queue.receive("q", Duration::from_secs(30)).unwrap().unwrap();
        queue.release(&delivery).unwrap();

        let woken = tokio::time::timeout(Duration::from_millis(50), queue.wait_for_publish()).await;
        assert!(woken.is_err());
        assert!(queue.receive("q", Duration::from_secs(30)).unwrap().is_some());
    }
}
