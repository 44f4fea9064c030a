// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Static path-prefix routing from the gateway to internal services.

use std::net::SocketAddr;

use url::Url;

use crate::config::Listeners;

/// One internal service reachable behind a path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    /// Human-readable service name, used in logs and the fallback body.
    pub name: &'static str,
    /// Path prefix without trailing slash, e.g. `/api/v1/orders`.
    pub prefix: &'static str,
    pub base: Url,
}

#[derive(Debug, Clone, Default)]
pub struct UpstreamTable {
    routes: Vec<Upstream>,
}

impl UpstreamTable {
    /// Longest prefixes are matched first.
    pub fn new(mut routes: Vec<Upstream>) -> Self {
        routes.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { routes }
    }

    /// The four internal services at the addresses they listen on.
    pub fn from_listeners(listeners: &Listeners) -> Result<Self, url::ParseError> {
        let upstream = |name, prefix, addr: SocketAddr| -> Result<Upstream, url::ParseError> {
            Ok(Upstream {
                name,
                prefix,
                base: Url::parse(&format!("http://{addr}"))?,
            })
        };

        Ok(Self::new(vec![
            upstream("Auth", "/api/v1/auth", listeners.auth)?,
            upstream("Order", "/api/v1/orders", listeners.orders)?,
            upstream("Restaurant", "/api/v1/restaurants", listeners.restaurants)?,
            upstream("Notification", "/api/v1/notifications", listeners.notifications)?,
        ]))
    }

    /// Upstream whose prefix matches `path` on a segment boundary.
    pub fn resolve(&self, path: &str) -> Option<&Upstream> {
        self.routes.iter().find(|upstream| {
            path.strip_prefix(upstream.prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

impl Upstream {
    /// Absolute upstream URL for an inbound path and query.
    pub fn target(&self, path_and_query: &str) -> Result<Url, url::ParseError> {
        self.base.join(path_and_query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listeners() -> Listeners {
        Listeners {
            gateway: "0.0.0.0:8080".parse().unwrap(),
            auth: "127.0.0.1:8081".parse().unwrap(),
            orders: "127.0.0.1:8082".parse().unwrap(),
            restaurants: "127.0.0.1:8083".parse().unwrap(),
            notifications: "[::1]:8084".parse().unwrap(),
        }
    }

    #[test]
    fn resolves_on_segment_boundaries() {
        let table = UpstreamTable::from_listeners(&listeners()).unwrap();

        assert_eq!(table.resolve("/api/v1/orders").unwrap().name, "Order");
        assert_eq!(table.resolve("/api/v1/orders/customer/7").unwrap().name, "Order");
        assert_eq!(table.resolve("/api/v1/auth/signin").unwrap().name, "Auth");
        assert!(table.resolve("/api/v1/ordersx").is_none());
        assert!(table.resolve("/api/v2/orders").is_none());
        assert!(table.resolve("/").is_none());
    }

    #[test]
    fn longer_prefix_wins() {
        let base = Url::parse("http://127.0.0.1:1").unwrap();
        let table = UpstreamTable::new(vec![
            Upstream { name: "Broad", prefix: "/api", base: base.clone() },
            Upstream { name: "Narrow", prefix: "/api/v1/orders", base },
        ]);
        assert_eq!(table.resolve("/api/v1/orders/1").unwrap().name, "Narrow");
        assert_eq!(table.resolve("/api/v1/other").unwrap().name, "Broad");
    }

    #[test]
    fn target_keeps_path_and_query() {
        let table = UpstreamTable::from_listeners(&listeners()).unwrap();
        let upstream = table.resolve("/api/v1/notifications").unwrap();
        let url = upstream.target("/api/v1/notifications/recipient/7?page=2").unwrap();
        assert_eq!(url.as_str(), "http://[::1]:8084/api/v1/notifications/recipient/7?page=2");
    }
}
