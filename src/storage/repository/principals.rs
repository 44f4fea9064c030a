// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Principal (user account) repository used by the credential issuer.

use redb::TableDefinition;
use serde::{Deserialize, Serialize};

use crate::storage::{RecordStore, RecordTable, StorageError, StorageResult};
use crate::auth::Role;

/// Principals: id → StoredPrincipal.
pub const PRINCIPALS: RecordTable = TableDefinition::new("principals");

/// A user account as held by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredPrincipal {
    pub id: u64,
    /// Normalized (lowercase, NFKC) email used as the sign-in identifier.
    pub email: String,
    pub full_name: String,
    pub role: Role,
    /// Encoded one-way password hash.
    pub password_hash: String,
}

/// Repository for principal lookups.
pub struct PrincipalRepository<'a> {
    store: &'a RecordStore,
}

impl<'a> PrincipalRepository<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Find a principal by its normalized email.
    pub fn find_by_email(&self, email: &str) -> StorageResult<Option<StoredPrincipal>> {
        let mut matches = self
            .store
            .scan(PRINCIPALS, |p: &StoredPrincipal| p.email == email)?;
        Ok(matches.pop())
    }

    pub fn exists_by_email(&self, email: &str) -> StorageResult<bool> {
        Ok(self.find_by_email(email)?.is_some())
    }

    /// Create a principal with the next free id.
    pub fn create(
        &self,
        email: &str,
        full_name: &str,
        role: Role,
        password_hash: String,
    ) -> StorageResult<StoredPrincipal> {
        if self.exists_by_email(email)? {
            return Err(StorageError::AlreadyExists(format!("Principal {email}")));
        }

        self.store.insert_new(PRINCIPALS, |id| StoredPrincipal {
            id,
            email: email.to_string(),
            full_name: full_name.to_string(),
            role,
            password_hash,
        })
    }

    /// Insert a principal under a fixed id (imports, fixtures).
    pub fn insert(&self, principal: &StoredPrincipal) -> StorageResult<()> {
        if self.exists_by_email(&principal.email)? {
            return Err(StorageError::AlreadyExists(format!(
                "Principal {}",
                principal.email
            )));
        }
        self.store.insert(PRINCIPALS, principal.id, principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (RecordStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(&dir.path().join("auth.redb"), &[PRINCIPALS]).unwrap();
        (store, dir)
    }

    #[test]
    fn create_and_find_by_email() {
        let (store, _dir) = temp_store();
        let repo = PrincipalRepository::new(&store);

        let created = repo
            .create("owner@example.com", "Restaurant Owner", Role::RestaurantOwner, "h".into())
            .unwrap();
        assert_eq!(created.id, 1);

        let found = repo.find_by_email("owner@example.com").unwrap().unwrap();
        assert_eq!(found, created);
        assert!(repo.find_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let (store, _dir) = temp_store();
        let repo = PrincipalRepository::new(&store);
        repo.create("c@x.com", "C", Role::Customer, "h".into()).unwrap();

        let err = repo
            .create("c@x.com", "Other", Role::Customer, "h".into())
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }
}
