// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::Identity,
    error::ApiError,
    models::{Order, OrderRequest},
    state::OrderState,
    storage::OrderRepository,
};

/// Body of the public availability probe.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResilienceResponse {
    pub service: String,
    pub status: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = OrderRequest,
    tag = "Orders",
    responses(
        (status = 201, body = Order),
        (status = 400, description = "Missing restaurant or description, or negative amount"),
        (status = 401, description = "No identity"),
        (status = 403, description = "Caller is not a customer")
    )
)]
pub async fn create_order(
    State(state): State<OrderState>,
    Identity(caller): Identity,
    Json(request): Json<OrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state.pipeline.create_order(request, &caller)?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{order_id}",
    params(("order_id" = u64, Path, description = "Order id")),
    tag = "Orders",
    responses((status = 200, body = Order), (status = 404, description = "Unknown order"))
)]
pub async fn get_order(
    Path(order_id): Path<u64>,
    State(state): State<OrderState>,
) -> Result<Json<Order>, ApiError> {
    OrderRepository::new(&state.orders)
        .get(order_id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Order {order_id} not found")))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/customer/{customer_id}",
    params(("customer_id" = u64, Path, description = "Customer (user) id")),
    tag = "Orders",
    responses((status = 200, body = [Order]))
)]
pub async fn list_customer_orders(
    Path(customer_id): Path<u64>,
    State(state): State<OrderState>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(OrderRepository::new(&state.orders).list_by_customer(customer_id)?))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/restaurant/{restaurant_id}",
    params(("restaurant_id" = u64, Path, description = "Restaurant id")),
    tag = "Orders",
    responses((status = 200, body = [Order]))
)]
pub async fn list_restaurant_orders(
    Path(restaurant_id): Path<u64>,
    State(state): State<OrderState>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(OrderRepository::new(&state.orders).list_by_restaurant(restaurant_id)?))
}

/// Public probe the gateway's fallback checks use.
#[utoipa::path(
    get,
    path = "/api/v1/orders/resilience-checker",
    tag = "Orders",
    responses((status = 200, body = ResilienceResponse))
)]
pub async fn resilience_checker() -> Json<ResilienceResponse> {
    Json(ResilienceResponse {
        service: "order-service".to_string(),
        status: "ok".to_string(),
    })
}
