// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Identity is established once, at the edge, and carried inward as headers.
//!
//! ## Auth Flow
//!
//! 1. Client signs in at the auth service and receives an HS256 token
//! 2. Client sends `Authorization: Bearer <token>` to the gateway
//! 3. Gateway (edge verifier):
//!    - Strips any client-supplied `X-User-*` headers
//!    - Verifies signature and expiry
//!    - Writes `X-User-Id`, `X-User-Role`, `X-User-Email`, `X-User-FullName`
//!    - Drops the `Authorization` header and proxies the request
//! 4. Internal service (header trust filter):
//!    - Builds a `RequestIdentity` from the headers, with authority `ROLE_<role>`
//!    - Route policy and handlers authorize against it
//!
//! ## Security
//!
//! - Only the issuer and the gateway hold the token secret
//! - Internal services listen on the internal address only; optionally they
//!   also require a hop signature over the headers
//! - An untrusted token is forwarded without identity (fail-open) unless the
//!   reject policy is configured

pub mod claims;
pub mod error;
pub mod extractor;
pub mod guard;
pub mod headers;
pub mod identity;
pub mod issuer;
pub mod middleware;
pub mod password;
pub mod roles;
pub mod token;

pub use claims::{IdentityClaims, TokenClaims};
pub use error::AuthError;
pub use extractor::Identity;
pub use guard::{authorize, ensure_owner, Access, OwnedResource};
pub use headers::{HeaderTrust, HopSigner, TrustedHeaderSet};
pub use identity::RequestIdentity;
pub use issuer::{
    normalize_identifier, seed_demo_principals, CredentialIssuer, CredentialStore, IssuedToken,
};
pub use middleware::{edge_verifier, header_trust, EdgeOutcome, EdgeVerifier, TokenFailurePolicy};
pub use password::PasswordHasher;
pub use roles::Role;
pub use token::{SignedToken, TokenError, TokenSigner, TokenVerifier};
