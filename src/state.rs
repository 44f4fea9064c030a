// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared state for the gateway and the internal services.
//!
//! Every service gets its own state type holding only what it needs. In
//! particular, only [`AuthState`] carries the token signer and only the
//! gateway's [`EdgeVerifier`] carries the verification key.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::auth::{
    AuthError, CredentialIssuer, EdgeVerifier, HeaderTrust, HopSigner, PasswordHasher, TokenSigner,
    TokenVerifier,
};
use crate::config::Config;
use crate::pipeline::{OrderPipeline, QueuePublisher};
use crate::queue::{DurableQueue, QueueError};
use crate::storage::{RecordStore, StorageError, NOTIFICATIONS, ORDERS, PRINCIPALS, RESTAURANTS};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("queue: {0}")]
    Queue(#[from] QueueError),

    #[error("auth: {0}")]
    Auth(String),
}

impl From<AuthError> for StartupError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Internal(detail) => StartupError::Auth(detail),
            other => StartupError::Auth(other.to_string()),
        }
    }
}

/// One database per service, plus the queue.
#[derive(Clone)]
pub struct Stores {
    pub data_dir: PathBuf,
    pub auth: RecordStore,
    pub orders: RecordStore,
    pub restaurants: RecordStore,
    pub notifications: RecordStore,
    pub queue: DurableQueue,
}

impl Stores {
    pub fn open(data_dir: &Path) -> Result<Self, StartupError> {
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            auth: RecordStore::open(&data_dir.join("auth.redb"), &[PRINCIPALS])?,
            orders: RecordStore::open(&data_dir.join("orders.redb"), &[ORDERS])?,
            restaurants: RecordStore::open(&data_dir.join("restaurants.redb"), &[RESTAURANTS])?,
            notifications: RecordStore::open(
                &data_dir.join("notifications.redb"),
                &[NOTIFICATIONS],
            )?,
            queue: DurableQueue::open(&data_dir.join("queue.redb"))?,
        })
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub issuer: CredentialIssuer,
}

#[derive(Clone)]
pub struct OrderState {
    pub orders: RecordStore,
    pub pipeline: OrderPipeline,
}

impl OrderState {
    /// Orders persisted to `orders`, events published to `queue`.
    pub fn new(orders: RecordStore, queue: DurableQueue) -> Self {
        let pipeline = OrderPipeline::new(
            Arc::new(QueuePublisher::new(queue)),
            Arc::new(orders.clone()),
        );
        Self { orders, pipeline }
    }
}

#[derive(Clone)]
pub struct RestaurantState {
    pub restaurants: RecordStore,
}

#[derive(Clone)]
pub struct NotificationState {
    pub notifications: RecordStore,
}

/// Everything the binary wires together.
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub hasher: PasswordHasher,
    pub auth: AuthState,
    pub orders: OrderState,
    pub restaurants: RestaurantState,
    pub notifications: NotificationState,
    pub edge: EdgeVerifier,
    pub trust: HeaderTrust,
}

impl AppState {
    pub fn build(config: &Config) -> Result<Self, StartupError> {
        let stores = Stores::open(&config.data_dir)?;
        let hasher = PasswordHasher::default();

        let signer = TokenSigner::from_base64_secret(&config.jwt_secret, config.jwt_ttl)
            .map_err(|e| StartupError::Auth(e.to_string()))?;
        let verifier = TokenVerifier::from_base64_secret(&config.jwt_secret)
            .map_err(|e| StartupError::Auth(e.to_string()))?;
        let issuer = CredentialIssuer::new(Arc::new(stores.auth.clone()), signer, hasher.clone())?;

        let mut edge = EdgeVerifier::new(verifier, config.token_failure_policy);
        let trust = match &config.hop_secret {
            Some(secret) => {
                let signer = HopSigner::new(secret.as_bytes())
                    .map_err(|e| StartupError::Auth(e.to_string()))?;
                edge = edge.with_hop_signer(signer.clone());
                HeaderTrust::HopSecret(signer)
            }
            None => HeaderTrust::Network,
        };

        Ok(Self {
            auth: AuthState { issuer },
            orders: OrderState::new(stores.orders.clone(), stores.queue.clone()),
            restaurants: RestaurantState {
                restaurants: stores.restaurants.clone(),
            },
            notifications: NotificationState {
                notifications: stores.notifications.clone(),
            },
            stores,
            hasher,
            edge,
            trust,
        })
    }
}
