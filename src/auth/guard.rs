// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization guard: role and ownership checks.
//!
//! Route-level checks run from the route policy table before the handler.
//! Ownership needs the loaded resource, so handlers call [`ensure_owner`].

use super::{AuthError, RequestIdentity, Role};

/// Access rule attached to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone, with or without identity.
    Public,
    /// Any identity.
    Authenticated,
    /// An identity holding one of the listed roles.
    Roles(&'static [Role]),
    /// Like `Roles` (any identity when empty); the handler also checks
    /// ownership of the resource it loads.
    Owner(&'static [Role]),
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let roles = |roles: &[Role]| {
            roles
                .iter()
                .map(|r| r.as_str())
                .collect::<Vec<_>>()
                .join("|")
        };
        match *self {
            Access::Public => write!(f, "public"),
            Access::Authenticated => write!(f, "authenticated"),
            Access::Roles(r) => write!(f, "roles({})", roles(r)),
            Access::Owner(r) => write!(f, "owner({})", roles(r)),
        }
    }
}

/// Route-level check. Missing identity on anything but `Public` is 401.
pub fn authorize(identity: Option<&RequestIdentity>, access: Access) -> Result<(), AuthError> {
    let roles: &[Role] = match access {
        Access::Public => return Ok(()),
        Access::Authenticated => &[],
        Access::Roles(roles) | Access::Owner(roles) => roles,
    };
    let identity = identity.ok_or(AuthError::MissingIdentity)?;

    if roles.is_empty() || roles.iter().any(|role| identity.has_role(*role)) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %identity.id,
            authority = %identity.authority,
            required = %access,
            "Role check failed"
        );
        Err(AuthError::AccessDenied("insufficient role".into()))
    }
}

/// A resource with a single owning principal.
pub trait OwnedResource {
    fn owner_id(&self) -> u64;

    /// Used in denial messages.
    fn resource_kind(&self) -> &'static str;
}

/// Caller must own `resource`. Administrators are exempt.
///
/// A mismatch is `AccessDenied` (403), even though that reveals the resource
/// exists.
pub fn ensure_owner<R: OwnedResource>(
    identity: &RequestIdentity,
    resource: &R,
) -> Result<(), AuthError> {
    if identity.has_role(Role::Admin) {
        return Ok(());
    }
    if identity.subject_id()? == resource.owner_id() {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %identity.id,
            kind = resource.resource_kind(),
            "Ownership check failed"
        );
        Err(AuthError::AccessDenied(format!(
            "not the owner of this {}",
            resource.resource_kind()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::headers::TrustedHeaderSet;

    struct Kitchen {
        owner: u64,
    }

    impl OwnedResource for Kitchen {
        fn owner_id(&self) -> u64 {
            self.owner
        }
        fn resource_kind(&self) -> &'static str {
            "kitchen"
        }
    }

    fn identity(id: &str, role: &str) -> RequestIdentity {
        RequestIdentity::from_headers(TrustedHeaderSet {
            id: id.into(),
            role: role.into(),
            email: "someone@x.com".into(),
            full_name: None,
        })
    }

    #[test]
    fn public_needs_nothing() {
        assert!(authorize(None, Access::Public).is_ok());
    }

    #[test]
    fn protected_without_identity_is_unauthorized() {
        for access in [
            Access::Authenticated,
            Access::Roles(&[Role::Customer]),
            Access::Owner(&[]),
        ] {
            assert!(matches!(authorize(None, access), Err(AuthError::MissingIdentity)));
        }
    }

    #[test]
    fn role_requirement() {
        let customer = identity("7", "CUSTOMER");
        let owner = identity("2", "RESTAURANT_OWNER");
        let only_customers = Access::Roles(&[Role::Customer]);

        assert!(authorize(Some(&customer), only_customers).is_ok());
        assert!(matches!(
            authorize(Some(&owner), only_customers),
            Err(AuthError::AccessDenied(_))
        ));
        assert!(authorize(Some(&owner), Access::Authenticated).is_ok());
    }

    #[test]
    fn admin_has_no_implicit_roles() {
        let admin = identity("1", "ADMIN");
        assert!(authorize(Some(&admin), Access::Roles(&[Role::Customer])).is_err());
    }

    #[test]
    fn ownership() {
        let kitchen = Kitchen { owner: 2 };
        assert!(ensure_owner(&identity("2", "RESTAURANT_OWNER"), &kitchen).is_ok());
        assert!(matches!(
            ensure_owner(&identity("3", "RESTAURANT_OWNER"), &kitchen),
            Err(AuthError::AccessDenied(_))
        ));
        assert!(ensure_owner(&identity("1", "ADMIN"), &kitchen).is_ok());
        assert!(ensure_owner(&identity("x", "RESTAURANT_OWNER"), &kitchen).is_err());
    }
}
