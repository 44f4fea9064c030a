// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the [`Config`] parsed from them
//! once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Gateway bind address (the only public listener) | `0.0.0.0` |
//! | `PORT` | Gateway bind port | `8080` |
//! | `INTERNAL_HOST` | Bind address of the internal services | `127.0.0.1` |
//! | `AUTH_PORT` | Auth service port | `8081` |
//! | `ORDER_PORT` | Order service port | `8082` |
//! | `RESTAURANT_PORT` | Restaurant service port | `8083` |
//! | `NOTIFICATION_PORT` | Notification service port | `8084` |
//! | `DATA_DIR` | Directory holding the redb databases | `./data` |
//! | `JWT_SECRET` | Base64 HS256 token secret | Required |
//! | `JWT_TTL_SECS` | Token lifetime in seconds | `3600` |
//! | `TOKEN_FAILURE_POLICY` | `fail-open` or `reject` | `fail-open` |
//! | `INTERNAL_HOP_SECRET` | Signs identity headers between gateway and services | Optional |
//! | `SEED_DEMO_USERS` | Create one demo account per role on startup | `false` |
//! | `SEED_PASSWORD` | Password of the demo accounts | Required when seeding |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files for TLS at the gateway | Optional (plain HTTP) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use base64ct::{Base64, Encoding};

use crate::auth::TokenFailurePolicy;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const INTERNAL_HOST_ENV: &str = "INTERNAL_HOST";
pub const AUTH_PORT_ENV: &str = "AUTH_PORT";
pub const ORDER_PORT_ENV: &str = "ORDER_PORT";
pub const RESTAURANT_PORT_ENV: &str = "RESTAURANT_PORT";
pub const NOTIFICATION_PORT_ENV: &str = "NOTIFICATION_PORT";

/// Environment variable name for the data directory.
///
/// Each service keeps its own redb file here, plus `queue.redb` for the
/// order event queue.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the token secret (base64).
///
/// Loaded by the auth service (signing) and the gateway (verification)
/// only.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_TTL_SECS_ENV: &str = "JWT_TTL_SECS";
pub const TOKEN_FAILURE_POLICY_ENV: &str = "TOKEN_FAILURE_POLICY";
pub const INTERNAL_HOP_SECRET_ENV: &str = "INTERNAL_HOP_SECRET";
pub const SEED_DEMO_USERS_ENV: &str = "SEED_DEMO_USERS";
pub const SEED_PASSWORD_ENV: &str = "SEED_PASSWORD";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_INTERNAL_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_AUTH_PORT: u16 = 8081;
pub const DEFAULT_ORDER_PORT: u16 = 8082;
pub const DEFAULT_RESTAURANT_PORT: u16 = 8083;
pub const DEFAULT_NOTIFICATION_PORT: u16 = 8084;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_JWT_TTL_SECS: u64 = 3600;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Certificate and key for TLS termination at the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Listen addresses of the five servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listeners {
    pub gateway: SocketAddr,
    pub auth: SocketAddr,
    pub orders: SocketAddr,
    pub restaurants: SocketAddr,
    pub notifications: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listeners: Listeners,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub token_failure_policy: TokenFailurePolicy,
    pub hop_secret: Option<String>,
    /// Demo account password, when seeding is enabled.
    pub seed_password: Option<String>,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let internal_host =
            get(INTERNAL_HOST_ENV).unwrap_or_else(|| DEFAULT_INTERNAL_HOST.to_string());
        let port = |var: &'static str, default: u16| -> Result<u16, ConfigError> {
            get(var).map_or(Ok(default), |v| parse(var, &v))
        };

        let listeners = Listeners {
            gateway: socket_addr(HOST_ENV, &host, port(PORT_ENV, DEFAULT_PORT)?)?,
            auth: socket_addr(
                INTERNAL_HOST_ENV,
                &internal_host,
                port(AUTH_PORT_ENV, DEFAULT_AUTH_PORT)?,
            )?,
            orders: socket_addr(
                INTERNAL_HOST_ENV,
                &internal_host,
                port(ORDER_PORT_ENV, DEFAULT_ORDER_PORT)?,
            )?,
            restaurants: socket_addr(
                INTERNAL_HOST_ENV,
                &internal_host,
                port(RESTAURANT_PORT_ENV, DEFAULT_RESTAURANT_PORT)?,
            )?,
            notifications: socket_addr(
                INTERNAL_HOST_ENV,
                &internal_host,
                port(NOTIFICATION_PORT_ENV, DEFAULT_NOTIFICATION_PORT)?,
            )?,
        };

        let jwt_secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        match Base64::decode_vec(&jwt_secret) {
            Ok(bytes) if !bytes.is_empty() => {}
            Ok(_) => {
                return Err(ConfigError::Invalid {
                    var: JWT_SECRET_ENV,
                    message: "decodes to an empty key".into(),
                })
            }
            Err(e) => {
                return Err(ConfigError::Invalid {
                    var: JWT_SECRET_ENV,
                    message: format!("not valid base64: {e}"),
                })
            }
        }

        let jwt_ttl_secs: u64 = get(JWT_TTL_SECS_ENV)
            .map_or(Ok(DEFAULT_JWT_TTL_SECS), |v| parse(JWT_TTL_SECS_ENV, &v))?;
        if jwt_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                var: JWT_TTL_SECS_ENV,
                message: "must be positive".into(),
            });
        }

        let token_failure_policy = get(TOKEN_FAILURE_POLICY_ENV)
            .map_or(Ok(TokenFailurePolicy::default()), |v| parse(TOKEN_FAILURE_POLICY_ENV, &v))?;

        let seed_demo_users = get(SEED_DEMO_USERS_ENV).map(|v| parse_bool(SEED_DEMO_USERS_ENV, &v));
        let seed_password = match seed_demo_users {
            Some(Err(e)) => return Err(e),
            Some(Ok(true)) => {
                Some(get(SEED_PASSWORD_ENV).ok_or(ConfigError::Missing(SEED_PASSWORD_ENV))?)
            }
            Some(Ok(false)) | None => None,
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            listeners,
            data_dir: get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()).into(),
            jwt_secret,
            jwt_ttl: Duration::from_secs(jwt_ttl_secs),
            token_failure_policy,
            hop_secret: get(INTERNAL_HOP_SECRET_ENV),
            seed_password,
            tls,
            log_format,
        })
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        message: e.to_string(),
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            var,
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

fn socket_addr(var: &'static str, host: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    let addr = if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };
    parse(var, &addr)
}
