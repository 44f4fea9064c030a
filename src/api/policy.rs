// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route policy table.
//!
//! Every route of an internal service is declared together with its access
//! rule. The table is validated when the service starts and can be listed in
//! tests, so there is no route without an explicit policy.

use axum::{
    extract::{Request, State},
    handler::Handler,
    http::Method,
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::{on, MethodFilter},
    Router,
};

use crate::auth::{authorize, Access, RequestIdentity};

/// One (method, path) → access rule entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    pub method: Method,
    pub path: &'static str,
    pub access: Access,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("route table is empty")]
    Empty,

    #[error("path must start with '/': {0}")]
    RelativePath(&'static str),

    #[error("duplicate route {method} {path}")]
    Duplicate { method: Method, path: &'static str },

    #[error("unsupported method {method} for {path}")]
    UnsupportedMethod { method: Method, path: &'static str },
}

type RouteBuilder<S> = Box<dyn FnOnce(MethodFilter) -> axum::routing::MethodRouter<S> + Send>;

/// Routes of one service with their access rules.
pub struct RouteTable<S> {
    entries: Vec<(RoutePolicy, RouteBuilder<S>)>,
}

impl<S> Default for RouteTable<S> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<S> RouteTable<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route<H, T>(
        mut self,
        method: Method,
        path: &'static str,
        access: Access,
        handler: H,
    ) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        let policy = RoutePolicy { method, path, access };
        let build: RouteBuilder<S> = Box::new(move |filter| {
            on(filter, handler).route_layer(from_fn_with_state(access, enforce_access))
        });
        self.entries.push((policy, build));
        self
    }

    /// All declared policies, in declaration order.
    pub fn policies(&self) -> Vec<RoutePolicy> {
        self.entries.iter().map(|(policy, _)| policy.clone()).collect()
    }

    /// Access rule for an exact (method, path) pair.
    pub fn access_for(&self, method: &Method, path: &str) -> Option<Access> {
        self.entries
            .iter()
            .find(|(p, _)| p.method == *method && p.path == path)
            .map(|(p, _)| p.access)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.entries.is_empty() {
            return Err(PolicyError::Empty);
        }
        for (i, (policy, _)) in self.entries.iter().enumerate() {
            if !policy.path.starts_with('/') {
                return Err(PolicyError::RelativePath(policy.path));
            }
            if MethodFilter::try_from(policy.method.clone()).is_err() {
                return Err(PolicyError::UnsupportedMethod {
                    method: policy.method.clone(),
                    path: policy.path,
                });
            }
            let duplicate = self.entries[..i]
                .iter()
                .any(|(earlier, _)| earlier.method == policy.method && earlier.path == policy.path);
            if duplicate {
                return Err(PolicyError::Duplicate {
                    method: policy.method.clone(),
                    path: policy.path,
                });
            }
        }
        Ok(())
    }

    /// Validate, then build the router with each route guarded by its rule.
    pub fn into_router(self) -> Result<Router<S>, PolicyError> {
        self.validate()?;

        let mut router = Router::new();
        for (policy, build) in self.entries {
            let filter = MethodFilter::try_from(policy.method.clone()).map_err(|_| {
                PolicyError::UnsupportedMethod {
                    method: policy.method.clone(),
                    path: policy.path,
                }
            })?;
            tracing::debug!(
                method = %policy.method,
                path = policy.path,
                access = %policy.access,
                "Route registered"
            );
            router = router.route(policy.path, build(filter));
        }
        Ok(router)
    }
}

/// Route-level authorization, run before the handler.
async fn enforce_access(State(access): State<Access>, request: Request, next: Next) -> Response {
    match authorize(request.extensions().get::<RequestIdentity>(), access) {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}
