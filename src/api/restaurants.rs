// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::{ensure_owner, Identity},
    error::ApiError,
    models::{Restaurant, RestaurantRequest},
    state::RestaurantState,
    storage::RestaurantRepository,
};

const NAME_MIN_CHARS: usize = 5;
const NAME_MAX_CHARS: usize = 50;

fn validate_name(name: &str) -> Result<&str, ApiError> {
    let name = name.trim();
    let chars = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&chars) {
        return Err(ApiError::bad_request(format!(
            "name must be between {NAME_MIN_CHARS} and {NAME_MAX_CHARS} characters"
        )));
    }
    Ok(name)
}

fn load(state: &RestaurantState, restaurant_id: u64) -> Result<Restaurant, ApiError> {
    RestaurantRepository::new(&state.restaurants)
        .get(restaurant_id)?
        .ok_or_else(|| ApiError::not_found(format!("Restaurant {restaurant_id} not found")))
}

#[utoipa::path(
    post,
    path = "/api/v1/restaurants",
    request_body = RestaurantRequest,
    tag = "Restaurants",
    responses(
        (status = 201, body = Restaurant),
        (status = 400, description = "Invalid name"),
        (status = 403, description = "Caller is not a restaurant owner")
    )
)]
pub async fn create_restaurant(
    State(state): State<RestaurantState>,
    Identity(caller): Identity,
    Json(request): Json<RestaurantRequest>,
) -> Result<(StatusCode, Json<Restaurant>), ApiError> {
    let name = validate_name(&request.name)?;
    let owner = caller.subject_id()?;
    let restaurant = RestaurantRepository::new(&state.restaurants).create(name, owner)?;

    tracing::info!(restaurant_id = restaurant.id, owner, "Restaurant created");
    Ok((StatusCode::CREATED, Json(restaurant)))
}

#[utoipa::path(
    get,
    path = "/api/v1/restaurants",
    tag = "Restaurants",
    responses((status = 200, body = [Restaurant]))
)]
pub async fn list_restaurants(
    State(state): State<RestaurantState>,
) -> Result<Json<Vec<Restaurant>>, ApiError> {
    Ok(Json(RestaurantRepository::new(&state.restaurants).list_all()?))
}

#[utoipa::path(
    get,
    path = "/api/v1/restaurants/my-restaurants",
    tag = "Restaurants",
    responses(
        (status = 200, body = [Restaurant]),
        (status = 403, description = "Caller is not a restaurant owner")
    )
)]
pub async fn my_restaurants(
    State(state): State<RestaurantState>,
    Identity(caller): Identity,
) -> Result<Json<Vec<Restaurant>>, ApiError> {
    let owner = caller.subject_id()?;
    Ok(Json(RestaurantRepository::new(&state.restaurants).list_by_owner(owner)?))
}

#[utoipa::path(
    get,
    path = "/api/v1/restaurants/{restaurant_id}",
    params(("restaurant_id" = u64, Path, description = "Restaurant id")),
    tag = "Restaurants",
    responses((status = 200, body = Restaurant), (status = 404, description = "Unknown restaurant"))
)]
pub async fn get_restaurant(
    Path(restaurant_id): Path<u64>,
    State(state): State<RestaurantState>,
) -> Result<Json<Restaurant>, ApiError> {
    Ok(Json(load(&state, restaurant_id)?))
}

#[utoipa::path(
    put,
    path = "/api/v1/restaurants/{restaurant_id}",
    params(("restaurant_id" = u64, Path, description = "Restaurant id")),
    request_body = RestaurantRequest,
    tag = "Restaurants",
    responses(
        (status = 200, body = Restaurant),
        (status = 403, description = "Caller does not own the restaurant"),
        (status = 404, description = "Unknown restaurant")
    )
)]
pub async fn update_restaurant(
    Path(restaurant_id): Path<u64>,
    State(state): State<RestaurantState>,
    Identity(caller): Identity,
    Json(request): Json<RestaurantRequest>,
) -> Result<Json<Restaurant>, ApiError> {
    let name = validate_name(&request.name)?;
    let existing = load(&state, restaurant_id)?;
    ensure_owner(&caller, &existing)?;

    let updated = RestaurantRepository::new(&state.restaurants).update_name(restaurant_id, name)?;
    tracing::info!(restaurant_id, user_id = %caller.id, "Restaurant updated");
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/restaurants/{restaurant_id}",
    params(("restaurant_id" = u64, Path, description = "Restaurant id")),
    tag = "Restaurants",
    responses(
        (status = 204),
        (status = 403, description = "Caller does not own the restaurant"),
        (status = 404, description = "Unknown restaurant")
    )
)]
pub async fn delete_restaurant(
    Path(restaurant_id): Path<u64>,
    State(state): State<RestaurantState>,
    Identity(caller): Identity,
) -> Result<StatusCode, ApiError> {
    let existing = load(&state, restaurant_id)?;
    ensure_owner(&caller, &existing)?;

    RestaurantRepository::new(&state.restaurants).delete(restaurant_id)?;
    tracing::info!(restaurant_id, user_id = %caller.id, "Restaurant deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/restaurants/{restaurant_id}/exists",
    params(("restaurant_id" = u64, Path, description = "Restaurant id")),
    tag = "Restaurants",
    responses((status = 200, body = bool))
)]
pub async fn restaurant_exists(
    Path(restaurant_id): Path<u64>,
    State(state): State<RestaurantState>,
) -> Result<Json<bool>, ApiError> {
    Ok(Json(RestaurantRepository::new(&state.restaurants).exists(restaurant_id)?))
}

#[utoipa::path(
    get,
    path = "/api/v1/restaurants/count",
    tag = "Restaurants",
    responses((status = 200, body = u64))
)]
pub async fn restaurant_count(State(state): State<RestaurantState>) -> Result<Json<u64>, ApiError> {
    Ok(Json(RestaurantRepository::new(&state.restaurants).count()?))
}
