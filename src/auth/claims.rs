// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims.
//!
//! `TokenClaims` is the JSON payload carried inside a signed token.
//! `IdentityClaims` is the validated, strongly typed form the rest of the
//! crate works with. A payload that does not convert is treated exactly like
//! a token with a bad signature.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::token::TokenError;
use super::Role;

/// Token payload as serialized on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    /// Subject: the principal id as a decimal string
    pub sub: String,
    pub user_id: u64,
    pub role: Role,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// Identity carried by a valid token. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub subject_id: u64,
    pub role: Role,
    pub email: String,
    pub display_name: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IdentityClaims {
    /// Whether the claims are still within their validity window at `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl From<&IdentityClaims> for TokenClaims {
    fn from(claims: &IdentityClaims) -> Self {
        Self {
            sub: claims.subject_id.to_string(),
            user_id: claims.subject_id,
            role: claims.role,
            email: claims.email.clone(),
            full_name: claims.display_name.clone(),
            iat: claims.issued_at.timestamp(),
            exp: claims.expires_at.timestamp(),
        }
    }
}

impl TryFrom<TokenClaims> for IdentityClaims {
    type Error = TokenError;

    fn try_from(claims: TokenClaims) -> Result<Self, Self::Error> {
        let subject_id: u64 = claims
            .sub
            .parse()
            .map_err(|_| TokenError::InvalidClaims("subject is not numeric".into()))?;
        if subject_id != claims.user_id {
            return Err(TokenError::InvalidClaims(
                "subject does not match userId".into(),
            ));
        }
        if claims.email.is_empty() {
            return Err(TokenError::InvalidClaims("email is empty".into()));
        }

        let issued_at = DateTime::from_timestamp(claims.iat, 0)
            .ok_or_else(|| TokenError::InvalidClaims("iat out of range".into()))?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| TokenError::InvalidClaims("exp out of range".into()))?;

        Ok(Self {
            subject_id,
            role: claims.role,
            email: claims.email,
            display_name: claims.full_name,
            issued_at,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(sub: &str, user_id: u64) -> TokenClaims {
        TokenClaims {
            sub: sub.into(),
            user_id,
            role: Role::Customer,
            email: "c@x.com".into(),
            full_name: "Cee".into(),
            iat: 1_700_000_000,
            exp: 1_700_003_600,
        }
    }

    #[test]
    fn converts_valid_wire_claims() {
        let claims = IdentityClaims::try_from(wire("7", 7)).unwrap();
        assert_eq!(claims.subject_id, 7);
        assert_eq!(claims.display_name, "Cee");
        assert_eq!(TokenClaims::from(&claims), wire("7", 7));
    }

    #[test]
    fn rejects_non_numeric_subject() {
        assert!(matches!(
            IdentityClaims::try_from(wire("alice", 7)),
            Err(TokenError::InvalidClaims(_))
        ));
    }

    #[test]
    fn rejects_subject_mismatch() {
        assert!(IdentityClaims::try_from(wire("8", 7)).is_err());
    }

    #[test]
    fn payload_uses_camel_case() {
        let json = serde_json::to_value(wire("7", 7)).unwrap();
        assert_eq!(json["userId"], 7);
        assert_eq!(json["fullName"], "Cee");
        assert_eq!(json["role"], "CUSTOMER");
    }

    #[test]
    fn unknown_role_does_not_decode() {
        let raw = r#"{"sub":"7","userId":7,"role":"CHEF","email":"c@x.com","iat":1,"exp":2}"#;
        assert!(serde_json::from_str::<TokenClaims>(raw).is_err());
    }

    #[test]
    fn liveness_is_strict_before_expiry() {
        let claims = IdentityClaims::try_from(wire("7", 7)).unwrap();
        assert!(claims.is_live_at(claims.expires_at - chrono::Duration::seconds(1)));
        assert!(!claims.is_live_at(claims.expires_at));
    }
}
