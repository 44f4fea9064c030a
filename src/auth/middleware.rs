// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity middleware for Axum.
//!
//! - [`edge_verifier`] runs at the gateway. It turns a bearer token into the
//!   trusted header set before the request is proxied inward.
//! - [`header_trust`] runs in every internal service. It turns the trusted
//!   header set into a [`RequestIdentity`] in the request extensions.
//!
//! Internal services never see tokens and never hold the token secret.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};

use super::claims::IdentityClaims;
use super::headers::{HeaderTrust, HopSigner, TrustedHeaderSet, USER_SIGNATURE};
use super::token::{TokenError, TokenVerifier};
use super::{AuthError, RequestIdentity};

/// What the edge does with a request whose bearer token fails verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenFailurePolicy {
    /// Forward without identity; protected routes answer 401 downstream.
    #[default]
    FailOpen,
    /// Answer 401 at the edge.
    Reject,
}

impl FromStr for TokenFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-open" | "fail_open" | "open" => Ok(TokenFailurePolicy::FailOpen),
            "reject" => Ok(TokenFailurePolicy::Reject),
            other => Err(format!(
                "unknown token failure policy '{other}' (expected 'fail-open' or 'reject')"
            )),
        }
    }
}

impl std::fmt::Display for TokenFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenFailurePolicy::FailOpen => write!(f, "fail-open"),
            TokenFailurePolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Result of running the edge verifier over one request.
#[derive(Debug)]
pub enum EdgeOutcome {
    /// No bearer token; forwarded unchanged.
    Anonymous,
    /// Token verified; identity headers written.
    Verified(IdentityClaims),
    /// Token present but not trusted; no identity headers written.
    Untrusted(TokenError),
}

/// Gateway filter state. Loaded once at startup, no per-request state.
#[derive(Clone)]
pub struct EdgeVerifier {
    verifier: Arc<TokenVerifier>,
    policy: TokenFailurePolicy,
    hop_signer: Option<HopSigner>,
}

impl EdgeVerifier {
    pub fn new(verifier: TokenVerifier, policy: TokenFailurePolicy) -> Self {
        Self {
            verifier: Arc::new(verifier),
            policy,
            hop_signer: None,
        }
    }

    /// Also sign the header set for services running in hop-secret mode.
    pub fn with_hop_signer(mut self, signer: HopSigner) -> Self {
        self.hop_signer = Some(signer);
        self
    }

    pub fn policy(&self) -> TokenFailurePolicy {
        self.policy
    }

    /// Rewrite `headers` in place.
    ///
    /// Client-supplied identity headers are always removed first.
    pub fn apply(&self, headers: &mut HeaderMap, now: DateTime<Utc>) -> EdgeOutcome {
        if TrustedHeaderSet::strip(headers) {
            tracing::warn!("Dropped client-supplied identity headers");
        }

        let Some(token) = bearer_token(headers) else {
            return EdgeOutcome::Anonymous;
        };

        let claims = match self.verifier.verify(&token, now) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Bearer token not trusted");
                return EdgeOutcome::Untrusted(e);
            }
        };

        let set = TrustedHeaderSet::from_claims(&claims);
        if let Err(e) = set.write_to(headers) {
            TrustedHeaderSet::strip(headers);
            tracing::warn!(
                error = %e,
                user_id = claims.subject_id,
                "Claims not representable as headers"
            );
            return EdgeOutcome::Untrusted(TokenError::InvalidClaims(e.to_string()));
        }
        if let Some(signer) = &self.hop_signer {
            if let Ok(value) = HeaderValue::from_str(&signer.sign(&set)) {
                headers.insert(USER_SIGNATURE, value);
            }
        }

        tracing::debug!(user_id = claims.subject_id, role = %claims.role, "Identity headers set");
        EdgeOutcome::Verified(claims)
    }
}

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Gateway middleware: verify the bearer token and inject identity headers.
pub async fn edge_verifier(
    State(edge): State<EdgeVerifier>,
    mut request: Request,
    next: Next,
) -> Response {
    let outcome = edge.apply(request.headers_mut(), Utc::now());

    if let EdgeOutcome::Untrusted(_) = outcome {
        if edge.policy == TokenFailurePolicy::Reject {
            return AuthError::InvalidToken.into_response();
        }
    }
    next.run(request).await
}

/// Service middleware: build the request identity from trusted headers.
pub async fn header_trust(
    State(trust): State<HeaderTrust>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(set) = trust.accept(request.headers()) {
        let identity = RequestIdentity::from_headers(set);
        tracing::debug!(
            user_id = %identity.id,
            authority = %identity.authority,
            "Request identity established"
        );
        request.extensions_mut().insert(identity);
    }
    next.run(request).await
}
