// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Restaurant repository for the restaurant service.

use redb::TableDefinition;

use crate::storage::{RecordStore, RecordTable, StorageError, StorageResult};
use crate::auth::OwnedResource;
use crate::models::Restaurant;

/// Restaurants: id → Restaurant.
pub const RESTAURANTS: RecordTable = TableDefinition::new("restaurants");

impl OwnedResource for Restaurant {
    fn owner_id(&self) -> u64 {
        self.owner
    }

    fn resource_kind(&self) -> &'static str {
        "restaurant"
    }
}

/// Repository for restaurant rows.
pub struct RestaurantRepository<'a> {
    store: &'a RecordStore,
}

impl<'a> RestaurantRepository<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    pub fn create(&self, name: &str, owner: u64) -> StorageResult<Restaurant> {
        self.store.insert_new(RESTAURANTS, |id| Restaurant {
            id,
            name: name.to_string(),
            owner,
        })
    }

    pub fn get(&self, restaurant_id: u64) -> StorageResult<Option<Restaurant>> {
        self.store.get(RESTAURANTS, restaurant_id)
    }

    pub fn exists(&self, restaurant_id: u64) -> StorageResult<bool> {
        Ok(self.get(restaurant_id)?.is_some())
    }

    pub fn list_all(&self) -> StorageResult<Vec<Restaurant>> {
        self.store.scan(RESTAURANTS, |_: &Restaurant| true)
    }

    pub fn list_by_owner(&self, owner: u64) -> StorageResult<Vec<Restaurant>> {
        self.store.scan(RESTAURANTS, |r: &Restaurant| r.owner == owner)
    }

    /// Rename a restaurant. The owner never changes.
    pub fn update_name(&self, restaurant_id: u64, name: &str) -> StorageResult<Restaurant> {
        let mut restaurant = self
            .get(restaurant_id)?
            .ok_or_else(|| StorageError::NotFound(format!("Restaurant {restaurant_id}")))?;
        restaurant.name = name.to_string();
        self.store.update(RESTAURANTS, restaurant_id, &restaurant)?;
        Ok(restaurant)
    }

    pub fn delete(&self, restaurant_id: u64) -> StorageResult<()> {
        if !self.store.remove(RESTAURANTS, restaurant_id)? {
            return Err(StorageError::NotFound(format!("Restaurant {restaurant_id}")));
        }
        Ok(())
    }

    pub fn count(&self) -> StorageResult<u64> {
        self.store.count(RESTAURANTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (RecordStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store =
            RecordStore::open(&dir.path().join("restaurants.redb"), &[RESTAURANTS]).unwrap();
        (store, dir)
    }

    #[test]
    fn crud_round() {
        let (store, _dir) = temp_store();
        let repo = RestaurantRepository::new(&store);

        let created = repo.create("Burger Barn", 2).unwrap();
        repo.create("Noodle Nook", 5).unwrap();
        assert_eq!(repo.count().unwrap(), 2);
        assert_eq!(repo.list_by_owner(2).unwrap(), vec![created.clone()]);

        let renamed = repo.update_name(created.id, "Burger Palace").unwrap();
        assert_eq!(renamed.owner, 2);
        assert_eq!(repo.get(created.id).unwrap().unwrap().name, "Burger Palace");

        repo.delete(created.id).unwrap();
        assert!(!repo.exists(created.id).unwrap());
        assert!(matches!(
            repo.delete(created.id),
            Err(StorageError::NotFound(_))
        ));
    }
}
