// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::ApiError, models::Notification, state::NotificationState,
    storage::NotificationRepository,
};

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    tag = "Notifications",
    responses((status = 200, body = [Notification]))
)]
pub async fn list_notifications(
    State(state): State<NotificationState>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(NotificationRepository::new(&state.notifications).list_all()?))
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/recipient/{recipient_id}",
    params(("recipient_id" = u64, Path, description = "Recipient (user) id")),
    tag = "Notifications",
    responses((status = 200, body = [Notification]))
)]
pub async fn list_recipient_notifications(
    Path(recipient_id): Path<u64>,
    State(state): State<NotificationState>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(
        NotificationRepository::new(&state.notifications).list_by_recipient(recipient_id)?,
    ))
}
