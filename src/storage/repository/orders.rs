// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Order repository for the order service.

use redb::TableDefinition;

use crate::storage::{RecordStore, RecordTable, StorageResult};
use crate::models::Order;

/// Orders: id → Order.
pub const ORDERS: RecordTable = TableDefinition::new("orders");

/// Repository for order rows.
pub struct OrderRepository<'a> {
    store: &'a RecordStore,
}

impl<'a> OrderRepository<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Reserve an id for an order that is about to be placed.
    pub fn allocate_id(&self) -> StorageResult<u64> {
        self.store.next_id(ORDERS)
    }

    /// Persist an order under its pre-allocated id.
    pub fn insert(&self, order: &Order) -> StorageResult<()> {
        self.store.insert(ORDERS, order.id, order)
    }

    pub fn get(&self, order_id: u64) -> StorageResult<Option<Order>> {
        self.store.get(ORDERS, order_id)
    }

    pub fn list_by_customer(&self, customer_id: u64) -> StorageResult<Vec<Order>> {
        self.store
            .scan(ORDERS, |o: &Order| o.customer_id == customer_id)
    }

    pub fn list_by_restaurant(&self, restaurant_id: u64) -> StorageResult<Vec<Order>> {
        self.store
            .scan(ORDERS, |o: &Order| o.restaurant_id == restaurant_id)
    }
}
