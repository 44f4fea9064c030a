// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{
    auth::AuthError,
    models::{LoginRequest, LoginResponse},
    state::AuthState,
};

#[utoipa::path(
    post,
    path = "/api/v1/auth/signin",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, body = LoginResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn sign_in(
    State(state): State<AuthState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    // Password hashing is CPU-bound; keep it off the async workers
    let issuer = state.issuer.clone();
    let issued = tokio::task::spawn_blocking(move || {
        issuer.authenticate(&request.email, &request.password)
    })
    .await
    .map_err(|e| AuthError::Internal(e.to_string()))??;

    Ok(Json(LoginResponse {
        token: issued.token.into_inner(),
        user_id: issued.claims.subject_id,
        email: issued.claims.email,
        role: issued.claims.role,
        full_name: issued.claims.display_name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CredentialIssuer, PasswordHasher, Role, TokenSigner};
    use crate::storage::{PrincipalRepository, RecordStore, StoredPrincipal, PRINCIPALS};
    use base64::Engine;
    use std::{sync::Arc, time::Duration};

    fn state() -> (AuthState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(&dir.path().join("auth.redb"), &[PRINCIPALS]).unwrap();
        let hasher = PasswordHasher::new(1_000).unwrap();
        PrincipalRepository::new(&store)
            .insert(&StoredPrincipal {
                id: 2,
                email: "owner@x.com".into(),
                full_name: "Olu Owner".into(),
                role: Role::RestaurantOwner,
                password_hash: hasher.hash("pw").unwrap(),
            })
            .unwrap();
        let secret =
            base64::engine::general_purpose::STANDARD.encode(b"signin-handler-test-secret");
        let signer = TokenSigner::from_base64_secret(&secret, Duration::from_secs(60)).unwrap();
        let issuer = CredentialIssuer::new(Arc::new(store), signer, hasher).unwrap();
        (AuthState { issuer }, dir)
    }

    #[tokio::test]
    async fn sign_in_returns_token_and_profile() {
        let (state, _dir) = state();
        let Json(response) = sign_in(
            State(state),
            Json(LoginRequest {
                email: "owner@x.com".into(),
                password: "pw".into(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.user_id, 2);
        assert_eq!(response.role, Role::RestaurantOwner);
        assert_eq!(response.full_name, "Olu Owner");
        assert_eq!(response.token.split('.').count(), 3);
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let (state, _dir) = state();
        let result = sign_in(
            State(state),
            Json(LoginRequest {
                email: "owner@x.com".into(),
                password: "guess".into(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }
}
