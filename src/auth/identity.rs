// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request-scoped identity built from trusted headers.

use super::headers::TrustedHeaderSet;
use super::roles::AUTHORITY_PREFIX;
use super::{AuthError, Role};

/// Who is calling, for the lifetime of one request.
///
/// Lives in the request extensions and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    /// The single granted authority, `ROLE_<role>`.
    pub authority: String,
}

impl RequestIdentity {
    pub fn from_headers(set: TrustedHeaderSet) -> Self {
        let authority = if set.role.starts_with(AUTHORITY_PREFIX) {
            set.role.clone()
        } else {
            format!("{AUTHORITY_PREFIX}{}", set.role)
        };
        Self {
            id: set.id,
            email: set.email,
            full_name: set.full_name,
            role: set.role,
            authority,
        }
    }

    /// Numeric principal id, required wherever ids are compared or stored.
    pub fn subject_id(&self) -> Result<u64, AuthError> {
        self.id
            .parse()
            .map_err(|_| AuthError::AccessDenied("identity id is not numeric".into()))
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.authority == role.authority()
    }
}
