// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the request identity.
//!
//! The identity is placed in the request extensions by the
//! [`header_trust`](super::middleware::header_trust) middleware:
//!
//! ```rust,ignore
//! async fn my_handler(Identity(caller): Identity) -> impl IntoResponse {
//!     // caller is RequestIdentity
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, RequestIdentity};

/// Requires an identity; rejects with 401 when the request is anonymous.
pub struct Identity(pub RequestIdentity);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestIdentity>()
            .cloned()
            .map(Identity)
            .ok_or(AuthError::MissingIdentity)
    }
}
