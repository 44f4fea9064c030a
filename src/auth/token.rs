// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 token signing and verification.
//!
//! The shared secret is configured base64-encoded and is known only to the
//! credential issuer and the edge verifier. Internal services never load it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use super::claims::{IdentityClaims, TokenClaims};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token claims are invalid: {0}")]
    InvalidClaims(String),

    #[error("signing key is invalid: {0}")]
    InvalidKey(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// A compact `header.payload.signature` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken(String);

impl SignedToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for SignedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues tokens. Held by the credential issuer only.
#[derive(Clone)]
pub struct TokenSigner {
    key: EncodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn from_base64_secret(secret: &str, ttl: Duration) -> Result<Self, TokenError> {
        let key = EncodingKey::from_base64_secret(secret)
            .map_err(|e| TokenError::InvalidKey(e.to_string()))?;
        Ok(Self { key, ttl })
    }

    /// Build claims valid from `now` for the configured lifetime.
    pub fn claims_for(
        &self,
        subject_id: u64,
        role: super::Role,
        email: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<IdentityClaims, TokenError> {
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| TokenError::InvalidClaims(e.to_string()))?;
        // Whole seconds, matching what survives the wire format
        let issued_at = DateTime::from_timestamp(now.timestamp(), 0)
            .ok_or_else(|| TokenError::InvalidClaims("issue time out of range".into()))?;

        Ok(IdentityClaims {
            subject_id,
            role,
            email: email.to_string(),
            display_name: display_name.to_string(),
            issued_at,
            expires_at: issued_at + ttl,
        })
    }

    pub fn sign(&self, claims: &IdentityClaims) -> Result<SignedToken, TokenError> {
        let payload = TokenClaims::from(claims);
        let token = encode(&Header::new(Algorithm::HS256), &payload, &self.key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok(SignedToken(token))
    }
}

/// Verifies tokens. Held by the edge verifier only.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn from_base64_secret(secret: &str) -> Result<Self, TokenError> {
        let key = DecodingKey::from_base64_secret(secret)
            .map_err(|e| TokenError::InvalidKey(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against the caller's clock below, with no leeway
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self { key, validation })
    }

    /// Check signature and expiry, then decode the identity.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<IdentityClaims, TokenError> {
        let data = decode::<TokenClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => {
                    TokenError::InvalidClaims(e.to_string())
                }
                _ => TokenError::Malformed,
            }
        })?;

        let claims = IdentityClaims::try_from(data.claims)?;
        if !claims.is_live_at(now) {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
