// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::storage::RecordStore;

/// What a service's readiness depends on.
#[derive(Clone)]
pub struct HealthState {
    pub service: &'static str,
    pub store: RecordStore,
    pub data_dir: PathBuf,
}

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Name of the service answering.
    pub service: String,
    /// Data directory availability.
    pub data_dir: String,
    /// Whether the service database accepts reads.
    pub storage: String,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

fn status_word(ok: bool, failure: &str) -> String {
    if ok { "ok" } else { failure }.to_string()
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
        .with_state(state)
}

/// Health check endpoint handler.
///
/// Returns 200 if all checks pass, 503 if any check fails.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is unhealthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<ReadyResponse>) {
    let data_ok = state.data_dir.is_dir();
    let storage_ok = state.store.is_healthy();
    let all_ok = data_ok && storage_ok;

    let response = ReadyResponse {
        status: status_word(all_ok, "degraded"),
        checks: HealthChecks {
            service: state.service.to_string(),
            data_dir: status_word(data_ok, "missing"),
            storage: status_word(storage_ok, "unavailable"),
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler. Same checks as `/health`.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<HealthState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ORDERS;

    #[tokio::test]
    async fn healthy_store_reports_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(&dir.path().join("orders.redb"), &[ORDERS]).unwrap();
        let state = HealthState {
            service: "order-service",
            store,
            data_dir: dir.path().to_path_buf(),
        };

        let (status, Json(body)) = health(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.checks.service, "order-service");
    }

    #[tokio::test]
    async fn missing_data_dir_is_degraded() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(&dir.path().join("orders.redb"), &[ORDERS]).unwrap();
        let state = HealthState {
            service: "order-service",
            store,
            data_dir: dir.path().join("gone"),
        };

        let (status, Json(body)) = readiness(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.checks.data_dir, "missing");
    }
}
