// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded record store backed by redb (pure Rust, ACID).
//!
//! Every service owns one database file. Records are JSON documents keyed by
//! a numeric id; ids come from a per-table counter kept in the same database.
//!
//! ## Table Layout
//!
//! - `<entity>`: id (u64) → serialized record
//! - `sequences`: table name → last allocated id

use std::path::Path;
use std::sync::Arc;

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    TableHandle, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

/// A record table: numeric id → JSON bytes.
pub type RecordTable = TableDefinition<'static, u64, &'static [u8]>;

/// Id counters: table name → last allocated id.
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
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

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// RecordStore
// =============================================================================

/// Handle to one service database. Cloning shares the underlying database.
#[derive(Clone)]
pub struct RecordStore {
    db: Arc<Database>,
}

impl RecordStore {
    /// Open (or create) the database at `path` and pre-create `tables`.
    pub fn open(path: &Path, tables: &[RecordTable]) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SEQUENCES)?;
            for table in tables {
                let _ = write_txn.open_table(*table)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Allocate the next id for `table` without writing a record.
    pub fn next_id(&self, table: RecordTable) -> StorageResult<u64> {
        let write_txn = self.db.begin_write()?;
        let id = allocate_id(&write_txn, table)?;
        write_txn.commit()?;
        Ok(id)
    }

    /// Allocate an id and insert the record built from it, atomically.
    pub fn insert_new<T, F>(&self, table: RecordTable, build: F) -> StorageResult<T>
    where
        T: Serialize,
        F: FnOnce(u64) -> T,
    {
        let write_txn = self.db.begin_write()?;
        let record = {
            let id = allocate_id(&write_txn, table)?;
            let record = build(id);
            let json = serde_json::to_vec(&record)?;
            let mut records = write_txn.open_table(table)?;
            records.insert(id, json.as_slice())?;
            record
        };
        write_txn.commit()?;
        Ok(record)
    }

    /// Insert a record under an id the caller already holds.
    ///
    /// Fails with `AlreadyExists` if the id is taken.
    pub fn insert<T: Serialize>(
        &self,
        table: RecordTable,
        id: u64,
        record: &T,
    ) -> StorageResult<()> {
        let json = serde_json::to_vec(record)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut records = write_txn.open_table(table)?;
            if records.get(id)?.is_some() {
                return Err(StorageError::AlreadyExists(format!(
                    "{} {id}",
                    table.name()
                )));
            }
            records.insert(id, json.as_slice())?;

            // Keep the counter ahead of explicitly chosen ids
            let mut sequences = write_txn.open_table(SEQUENCES)?;
            let current = sequences.get(table.name())?.map(|v| v.value()).unwrap_or(0);
            if id > current {
                sequences.insert(table.name(), id)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Replace an existing record.
    pub fn update<T: Serialize>(
        &self,
        table: RecordTable,
        id: u64,
        record: &T,
    ) -> StorageResult<()> {
        let json = serde_json::to_vec(record)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut records = write_txn.open_table(table)?;
            if records.get(id)?.is_none() {
                return Err(StorageError::NotFound(format!("{} {id}", table.name())));
            }
            records.insert(id, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a record by id.
    pub fn get<T: DeserializeOwned>(
        &self,
        table: RecordTable,
        id: u64,
    ) -> StorageResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let records = read_txn.open_table(table)?;
        let record = match records.get(id)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(record)
    }

    /// Remove a record. Returns whether it existed.
    pub fn remove(&self, table: RecordTable, id: u64) -> StorageResult<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut records = write_txn.open_table(table)?;
            let removed = records.remove(id)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(existed)
    }

    /// All records matching `filter`, in id order.
    pub fn scan<T, F>(&self, table: RecordTable, filter: F) -> StorageResult<Vec<T>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let read_txn = self.db.begin_read()?;
        let records = read_txn.open_table(table)?;

        let mut results = Vec::new();
        for entry in records.iter()? {
            let (_, value) = entry?;
            let record: T = serde_json::from_slice(value.value())?;
            if filter(&record) {
                results.push(record);
            }
        }
        Ok(results)
    }

    /// Whether the database currently accepts read transactions.
    pub fn is_healthy(&self) -> bool {
        self.db.begin_read().is_ok()
    }

    /// Number of records in `table`.
    pub fn count(&self, table: RecordTable) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let records = read_txn.open_table(table)?;
        Ok(records.len()?)
    }
}

fn allocate_id(write_txn: &WriteTransaction, table: RecordTable) -> StorageResult<u64> {
    let mut sequences = write_txn.open_table(SEQUENCES)?;
    let next = sequences.get(table.name())?.map(|v| v.value()).unwrap_or(0) + 1;
    sequences.insert(table.name(), next)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    const WIDGETS: RecordTable = TableDefinition::new("widgets");

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        id: u64,
        name: String,
    }

    fn temp_store() -> (RecordStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(&dir.path().join("test.redb"), &[WIDGETS]).unwrap();
        (store, dir)
    }

    #[test]
    fn insert_new_allocates_increasing_ids() {
        let (store, _dir) = temp_store();
        let a = store
            .insert_new(WIDGETS, |id| Widget { id, name: "a".into() })
            .unwrap();
        let b = store
            .insert_new(WIDGETS, |id| Widget { id, name: "b".into() })
            .unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);

        let fetched: Widget = store.get(WIDGETS, 2).unwrap().unwrap();
        assert_eq!(fetched, b);
    }

    #[test]
    fn explicit_insert_moves_sequence_forward() {
        let (store, _dir) = temp_store();
        store
            .insert(WIDGETS, 7, &Widget { id: 7, name: "seven".into() })
            .unwrap();
        assert_eq!(store.next_id(WIDGETS).unwrap(), 8);
    }

    #[test]
    fn explicit_insert_rejects_duplicate_id() {
        let (store, _dir) = temp_store();
        let w = Widget { id: 3, name: "x".into() };
        store.insert(WIDGETS, 3, &w).unwrap();
        let err = store.insert(WIDGETS, 3, &w).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }

    #[test]
    fn update_requires_existing_record() {
        let (store, _dir) = temp_store();
        let err = store
            .update(WIDGETS, 1, &Widget { id: 1, name: "x".into() })
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn scan_filters_and_remove_deletes() {
        let (store, _dir) = temp_store();
        for name in ["keep", "drop", "keep"] {
            store
                .insert_new(WIDGETS, |id| Widget { id, name: name.into() })
                .unwrap();
        }

        let kept: Vec<Widget> = store.scan(WIDGETS, |w: &Widget| w.name == "keep").unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(store.count(WIDGETS).unwrap(), 3);

        assert!(store.remove(WIDGETS, 2).unwrap());
        assert!(!store.remove(WIDGETS, 2).unwrap());
        assert_eq!(store.count(WIDGETS).unwrap(), 2);
    }
}
