// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request forwarding from the gateway to an internal service.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::GatewayState;
use crate::error::ApiError;

/// Largest request body the gateway buffers before forwarding.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Connection-scoped headers that must not be forwarded (RFC 9110 §7.6.1).
const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Body returned when an upstream cannot be reached.
#[derive(Debug, Serialize)]
pub struct FallbackBody {
    pub message: String,
    pub status: String,
    pub error: String,
    pub path: String,
}

pub fn fallback(service: &str, path: &str) -> Response {
    let body = FallbackBody {
        message: format!("{service} service is temporarily unavailable. Please try again later."),
        status: "503 Service Unavailable".to_string(),
        error: "Service Unavailable".to_string(),
        path: path.to_string(),
    };
    (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
}

fn strip_connection_headers(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove(header::CONTENT_LENGTH);
}

/// Headers sent upstream: no credential and no connection-scoped fields.
fn upstream_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = inbound.clone();
    strip_connection_headers(&mut headers);
    headers.remove(header::HOST);
    headers.remove(header::AUTHORIZATION);
    headers
}

/// Catch-all gateway handler.
pub async fn forward(State(state): State<GatewayState>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    let Some(upstream) = state.upstreams.resolve(&path) else {
        return ApiError::not_found(format!("No route for {path}")).into_response();
    };

    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());
    let target = match upstream.target(&path_and_query) {
        Ok(url) => url,
        Err(e) => {
            return ApiError::bad_request(format!("Invalid request path: {e}")).into_response()
        }
    };

    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
                .into_response()
        }
    };

    let sent = state
        .client
        .request(parts.method.clone(), target)
        .headers(upstream_headers(&parts.headers))
        .body(body)
        .send()
        .await;

    let upstream_response = match sent {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(
                service = upstream.name,
                path = %path,
                error = %e,
                "Upstream unreachable"
            );
            return fallback(upstream.name, &path);
        }
    };

    let status = upstream_response.status();
    let mut headers = upstream_response.headers().clone();
    strip_connection_headers(&mut headers);
    let bytes = match upstream_response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                service = upstream.name,
                path = %path,
                error = %e,
                "Upstream response interrupted"
            );
            return fallback(upstream.name, &path);
        }
    };

    tracing::debug!(
        service = upstream.name,
        method = %parts.method,
        path = %path,
        status = status.as_u16(),
        "Proxied"
    );
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
