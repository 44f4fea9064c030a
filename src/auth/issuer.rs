// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential issuer: exchanges an email and password for a signed token.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use unicode_normalization::UnicodeNormalization;

use super::claims::IdentityClaims;
use super::password::PasswordHasher;
use super::token::{SignedToken, TokenSigner};
use super::{AuthError, Role};
use crate::storage::{PrincipalRepository, RecordStore, StorageError, StoredPrincipal};

/// Lookup of principals by normalized identifier.
pub trait CredentialStore: Send + Sync {
    fn find_principal(&self, identifier: &str) -> Result<Option<StoredPrincipal>, StorageError>;
}

impl CredentialStore for RecordStore {
    fn find_principal(&self, identifier: &str) -> Result<Option<StoredPrincipal>, StorageError> {
        PrincipalRepository::new(self).find_by_email(identifier)
    }
}

/// Result of a successful sign-in.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: SignedToken,
    pub claims: IdentityClaims,
}

#[derive(Clone)]
pub struct CredentialIssuer {
    store: Arc<dyn CredentialStore>,
    signer: TokenSigner,
    hasher: PasswordHasher,
    /// Verified against when the principal is unknown, so both paths cost the same
    dummy_hash: Arc<str>,
}

impl CredentialIssuer {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        signer: TokenSigner,
        hasher: PasswordHasher,
    ) -> Result<Self, AuthError> {
        let dummy_hash = hasher
            .hash("dummy-password-for-unknown-principals")
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(Self {
            store,
            signer,
            hasher,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn authenticate(&self, identifier: &str, secret: &str) -> Result<IssuedToken, AuthError> {
        self.authenticate_at(identifier, secret, Utc::now())
    }

    /// Every failure other than an internal one is `InvalidCredentials`.
    pub fn authenticate_at(
        &self,
        identifier: &str,
        secret: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let identifier = normalize_identifier(identifier);
        let principal = self
            .store
            .find_principal(&identifier)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let Some(principal) = principal else {
            let _ = self.hasher.verify(secret, &self.dummy_hash);
            tracing::debug!("Sign-in rejected");
            return Err(AuthError::InvalidCredentials);
        };
        if !self.hasher.verify(secret, &principal.password_hash) {
            tracing::debug!("Sign-in rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let claims = self
            .signer
            .claims_for(
                principal.id,
                principal.role,
                &principal.email,
                &principal.full_name,
                now,
            )
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let token = self
            .signer
            .sign(&claims)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        tracing::info!(user_id = principal.id, role = %principal.role, "Token issued");
        Ok(IssuedToken { token, claims })
    }
}

/// Canonical identifier form: trimmed, NFKC-normalized, lowercased.
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().nfkc().collect::<String>().to_lowercase()
}

/// Demo accounts created on an empty credential store.
const DEMO_PRINCIPALS: [(&str, &str, Role); 3] = [
    ("admin@foodplatform.local", "Platform Admin", Role::Admin),
    ("owner@foodplatform.local", "Restaurant Owner", Role::RestaurantOwner),
    ("customer@foodplatform.local", "Demo Customer", Role::Customer),
];

/// Seed one principal per role. Existing emails are left untouched.
///
/// Returns how many principals were created.
pub fn seed_demo_principals(
    store: &RecordStore,
    hasher: &PasswordHasher,
    password: &str,
) -> Result<usize, AuthError> {
    let internal = |e: StorageError| AuthError::Internal(e.to_string());
    let repo = PrincipalRepository::new(store);
    let mut created = 0;
    for (email, full_name, role) in DEMO_PRINCIPALS {
        if repo.exists_by_email(email).map_err(internal)? {
            continue;
        }
        let password_hash = hasher
            .hash(password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let principal = repo
            .create(email, full_name, role, password_hash)
            .map_err(internal)?;
        tracing::info!(user_id = principal.id, email, role = %role, "Seeded demo principal");
        created += 1;
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenVerifier;
    use crate::storage::PRINCIPALS;
    use base64::Engine;
    use std::time::Duration;

    struct Fixture {
        issuer: CredentialIssuer,
        verifier: TokenVerifier,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(&dir.path().join("auth.redb"), &[PRINCIPALS]).unwrap();
        let hasher = PasswordHasher::new(1_000).unwrap();
        PrincipalRepository::new(&store)
            .insert(&StoredPrincipal {
                id: 7,
                email: "c@x.com".into(),
                full_name: "Cee Customer".into(),
                role: Role::Customer,
                password_hash: hasher.hash("pw").unwrap(),
            })
            .unwrap();

        let secret =
            base64::engine::general_purpose::STANDARD.encode(b"issuer-test-secret-0123456789");
        let signer = TokenSigner::from_base64_secret(&secret, Duration::from_secs(3600)).unwrap();
        Fixture {
            issuer: CredentialIssuer::new(Arc::new(store), signer, hasher).unwrap(),
            verifier: TokenVerifier::from_base64_secret(&secret).unwrap(),
            _dir: dir,
        }
    }

    #[test]
    fn valid_credentials_issue_verifiable_token() {
        let f = fixture();
        let now = Utc::now();
        let issued = f.issuer.authenticate_at("c@x.com", "pw", now).unwrap();

        assert_eq!(issued.claims.subject_id, 7);
        assert_eq!(issued.claims.role, Role::Customer);
        assert_eq!(issued.claims.display_name, "Cee Customer");
        assert_eq!(
            issued.claims.expires_at - issued.claims.issued_at,
            chrono::Duration::seconds(3600)
        );

        let verified = f.verifier.verify(issued.token.as_str(), now).unwrap();
        assert_eq!(verified, issued.claims);
    }

    #[test]
    fn wrong_password_and_unknown_user_look_identical() {
        let f = fixture();
        let wrong = f.issuer.authenticate("c@x.com", "nope").unwrap_err();
        let unknown = f.issuer.authenticate("ghost@x.com", "pw").unwrap_err();

        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[test]
    fn identifier_is_normalized_before_lookup() {
        let f = fixture();
        assert!(f.issuer.authenticate("  C@X.COM ", "pw").is_ok());
        // Fullwidth letters fold to ASCII under NFKC
        assert_eq!(normalize_identifier("\u{FF43}@x.com"), "c@x.com");
    }

    #[test]
    fn seeding_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(&dir.path().join("auth.redb"), &[PRINCIPALS]).unwrap();
        let hasher = PasswordHasher::new(1_000).unwrap();

        assert_eq!(seed_demo_principals(&store, &hasher, "demo").unwrap(), 3);
        assert_eq!(seed_demo_principals(&store, &hasher, "demo").unwrap(), 0);
        let admin = store.find_principal("admin@foodplatform.local").unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
    }
}
