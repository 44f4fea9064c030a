// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Trusted identity headers passed from the gateway to internal services.
//!
//! | Header            | Value                          |
//! |-------------------|--------------------------------|
//! | `X-User-Id`       | principal id (decimal)         |
//! | `X-User-Role`     | role name, e.g. `CUSTOMER`     |
//! | `X-User-Email`    | principal email                |
//! | `X-User-FullName` | display name                   |
//! | `X-User-Signature`| optional HMAC over the above   |
//!
//! Only the gateway writes these. It removes any copies a client sent before
//! writing its own.

use axum::http::{header::InvalidHeaderValue, HeaderMap, HeaderName, HeaderValue};
use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::claims::IdentityClaims;

pub const USER_ID: HeaderName = HeaderName::from_static("x-user-id");
pub const USER_ROLE: HeaderName = HeaderName::from_static("x-user-role");
pub const USER_EMAIL: HeaderName = HeaderName::from_static("x-user-email");
pub const USER_FULL_NAME: HeaderName = HeaderName::from_static("x-user-fullname");
pub const USER_SIGNATURE: HeaderName = HeaderName::from_static("x-user-signature");

const IDENTITY_HEADERS: [HeaderName; 5] =
    [USER_ID, USER_ROLE, USER_EMAIL, USER_FULL_NAME, USER_SIGNATURE];

type HmacSha256 = Hmac<Sha256>;

/// The identity values carried between gateway and services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedHeaderSet {
    pub id: String,
    pub role: String,
    pub email: String,
    pub full_name: Option<String>,
}

impl TrustedHeaderSet {
    pub fn from_claims(claims: &IdentityClaims) -> Self {
        Self {
            id: claims.subject_id.to_string(),
            role: claims.role.as_str().to_string(),
            email: claims.email.clone(),
            full_name: Some(claims.display_name.clone()),
        }
    }

    /// Read the set from request headers.
    ///
    /// `None` unless id, email and role are all present and non-empty.
    pub fn read_from(headers: &HeaderMap) -> Option<Self> {
        let read = |name: &HeaderName| {
            headers
                .get(name)
                .and_then(|v| std::str::from_utf8(v.as_bytes()).ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        Some(Self {
            id: read(&USER_ID)?,
            role: read(&USER_ROLE)?,
            email: read(&USER_EMAIL)?,
            full_name: read(&USER_FULL_NAME),
        })
    }

    /// Write the set, replacing any existing values.
    pub fn write_to(&self, headers: &mut HeaderMap) -> Result<(), InvalidHeaderValue> {
        let id = HeaderValue::from_bytes(self.id.as_bytes())?;
        let role = HeaderValue::from_bytes(self.role.as_bytes())?;
        let email = HeaderValue::from_bytes(self.email.as_bytes())?;
        let full_name = self
            .full_name
            .as_deref()
            .map(|name| HeaderValue::from_bytes(name.as_bytes()))
            .transpose()?;

        headers.insert(USER_ID, id);
        headers.insert(USER_ROLE, role);
        headers.insert(USER_EMAIL, email);
        match full_name {
            Some(value) => {
                headers.insert(USER_FULL_NAME, value);
            }
            None => {
                headers.remove(USER_FULL_NAME);
            }
        }
        Ok(())
    }

    /// Remove every identity header, including the hop signature.
    pub fn strip(headers: &mut HeaderMap) -> bool {
        let mut stripped = false;
        for name in IDENTITY_HEADERS {
            // remove() only drops the first value; clear repeated headers too
            while headers.remove(&name).is_some() {
                stripped = true;
            }
        }
        stripped
    }

    fn signing_input(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}",
            self.id,
            self.role,
            self.email,
            self.full_name.as_deref().unwrap_or("")
        )
    }
}

/// Signs the header set with a secret shared by the gateway and the services.
#[derive(Clone)]
pub struct HopSigner {
    mac: HmacSha256,
}

impl HopSigner {
    pub fn new(secret: &[u8]) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(secret)?,
        })
    }

    pub fn sign(&self, set: &TrustedHeaderSet) -> String {
        let mut mac = self.mac.clone();
        mac.update(set.signing_input().as_bytes());
        Base64::encode_string(&mac.finalize().into_bytes())
    }

    pub fn verify(&self, set: &TrustedHeaderSet, signature: &str) -> bool {
        let Ok(expected) = Base64::decode_vec(signature.trim()) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(set.signing_input().as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

/// How an internal service decides whether to believe the identity headers.
#[derive(Clone, Default)]
pub enum HeaderTrust {
    /// Headers are trusted because only the gateway can reach the service.
    #[default]
    Network,
    /// Headers are trusted only with a valid `X-User-Signature`.
    HopSecret(HopSigner),
}

impl HeaderTrust {
    /// The trusted header set of a request, or `None` for anonymous.
    pub fn accept(&self, headers: &HeaderMap) -> Option<TrustedHeaderSet> {
        let set = TrustedHeaderSet::read_from(headers)?;
        match self {
            HeaderTrust::Network => Some(set),
            HeaderTrust::HopSecret(signer) => {
                let signature = headers
                    .get(&USER_SIGNATURE)
                    .and_then(|v| v.to_str().ok())?;
                if signer.verify(&set, signature) {
                    Some(set)
                } else {
                    tracing::warn!("Identity headers with invalid hop signature ignored");
                    None
                }
            }
        }
    }
}
