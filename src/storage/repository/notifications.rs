// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Notification repository for the notification service.

use chrono::Utc;
use redb::TableDefinition;

use crate::storage::{RecordStore, RecordTable, StorageResult};
use crate::models::Notification;

/// Notifications: id → Notification.
pub const NOTIFICATIONS: RecordTable = TableDefinition::new("notifications");

/// Repository for notification rows.
pub struct NotificationRepository<'a> {
    store: &'a RecordStore,
}

impl<'a> NotificationRepository<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Store a new unread notification.
    pub fn create(&self, recipient_id: u64, message: &str) -> StorageResult<Notification> {
        self.store.insert_new(NOTIFICATIONS, |id| Notification {
            id,
            recipient_id,
            message: message.to_string(),
            read: false,
            created_at: Utc::now(),
        })
    }

    pub fn list_by_recipient(&self, recipient_id: u64) -> StorageResult<Vec<Notification>> {
        self.store
            .scan(NOTIFICATIONS, |n: &Notification| n.recipient_id == recipient_id)
    }

    pub fn list_all(&self) -> StorageResult<Vec<Notification>> {
        self.store.scan(NOTIFICATIONS, |_: &Notification| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_notifications_start_unread() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            RecordStore::open(&dir.path().join("notifications.redb"), &[NOTIFICATIONS]).unwrap();
        let repo = NotificationRepository::new(&store);

        let n = repo.create(7, "hello").unwrap();
        repo.create(8, "other").unwrap();
        assert!(!n.read);
        assert_eq!(repo.list_by_recipient(7).unwrap(), vec![n]);
        assert_eq!(repo.list_all().unwrap().len(), 2);
    }
}
