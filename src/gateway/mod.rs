// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Public entry point.
//!
//! Every request passes the [`edge_verifier`] before it is proxied by path
//! prefix to an internal service. The gateway holds the token verification
//! key and nothing else; it keeps no per-request state.

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware::from_fn_with_state, routing::get, Json, Router};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::api::health::HealthResponse;
use crate::auth::{edge_verifier, EdgeVerifier};

pub mod proxy;
pub mod upstream;

pub use upstream::{Upstream, UpstreamTable};

/// Upper bound for one upstream round trip.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid upstream address: {0}")]
    Upstream(#[from] url::ParseError),

    #[error("HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct GatewayState {
    pub client: reqwest::Client,
    pub upstreams: Arc<UpstreamTable>,
}

impl GatewayState {
    pub fn new(upstreams: UpstreamTable) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            upstreams: Arc::new(upstreams),
        })
    }
}

async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub fn router(state: GatewayState, edge: EdgeVerifier) -> Router {
    Router::new()
        .route("/health/live", get(liveness))
        .fallback(proxy::forward)
        .with_state(state)
        .layer(from_fn_with_state(edge, edge_verifier))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}
