// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// Credential and token failures are deliberately generic: the message never
/// says whether the account exists or which check failed.
#[derive(Debug)]
pub enum AuthError {
    /// Unknown principal or wrong password
    InvalidCredentials,
    /// Protected operation reached without a request identity
    MissingIdentity,
    /// Bearer token rejected at the edge (reject policy only)
    InvalidToken,
    /// Identity present but not allowed to perform the operation
    AccessDenied(String),
    /// Internal error
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::MissingIdentity => "unauthorized",
            AuthError::InvalidToken => "invalid_token",
            AuthError::AccessDenied(_) => "access_denied",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::MissingIdentity
            | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::AccessDenied(_) => StatusCode::FORBIDDEN,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::MissingIdentity => write!(f, "Authentication is required"),
            AuthError::InvalidToken => write!(f, "Invalid or expired token"),
            AuthError::AccessDenied(msg) => write!(f, "Access denied: {msg}"),
            AuthError::Internal(_) => write!(f, "Internal authentication error"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Internal(detail) = &self {
            tracing::error!(error = %detail, "Authentication internal error");
        }
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
