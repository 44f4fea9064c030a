// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use food_platform::{
    api::{self, HealthState, PolicyError},
    auth::seed_demo_principals,
    config::{Config, LogFormat},
    gateway::{self, GatewayError, GatewayState, UpstreamTable},
    notifier::NotificationConsumer,
    state::{AppState, StartupError},
};

/// How long in-flight requests get to finish after shutdown is requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error("route policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("gateway: {0}")]
    Gateway(#[from] GatewayError),

    #[error("TLS: {0}")]
    Tls(std::io::Error),

    #[error("{service} server: {source}")]
    Serve {
        service: &'static str,
        source: std::io::Error,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_format);

    // Install the ring crypto provider for rustls (before any TLS operations)
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        tracing::warn!("rustls crypto provider already installed");
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Shutting down after fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), RunError> {
    let state = AppState::build(&config)?;

    if let Some(password) = &config.seed_password {
        let created = seed_demo_principals(&state.stores.auth, &state.hasher, password)
            .map_err(StartupError::from)?;
        tracing::info!(created, "Demo principals seeded");
    }

    let health = |service, store: &food_platform::storage::RecordStore| HealthState {
        service,
        store: store.clone(),
        data_dir: config.data_dir.clone(),
    };
    let services = [
        (
            "auth-service",
            config.listeners.auth,
            api::auth_service(
                state.auth.clone(),
                health("auth-service", &state.stores.auth),
                state.trust.clone(),
            )?,
        ),
        (
            "order-service",
            config.listeners.orders,
            api::order_service(
                state.orders.clone(),
                health("order-service", &state.stores.orders),
                state.trust.clone(),
            )?,
        ),
        (
            "restaurant-service",
            config.listeners.restaurants,
            api::restaurant_service(
                state.restaurants.clone(),
                health("restaurant-service", &state.stores.restaurants),
                state.trust.clone(),
            )?,
        ),
        (
            "notification-service",
            config.listeners.notifications,
            api::notification_service(
                state.notifications.clone(),
                health("notification-service", &state.stores.notifications),
                state.trust.clone(),
            )?,
        ),
    ];

    let upstreams = UpstreamTable::from_listeners(&config.listeners).map_err(GatewayError::from)?;
    let gateway = gateway::router(GatewayState::new(upstreams)?, state.edge.clone());
    let tls = match &config.tls {
        Some(paths) => Some(
            RustlsConfig::from_pem_file(&paths.cert, &paths.key)
                .await
                .map_err(RunError::Tls)?,
        ),
        None => None,
    };

    tracing::info!(
        policy = %state.edge.policy(),
        hop_signature = config.hop_secret.is_some(),
        data_dir = %config.data_dir.display(),
        "Starting food platform"
    );

    let shutdown = CancellationToken::new();
    let mut servers = JoinSet::new();
    for (name, addr, router) in services {
        servers.spawn(serve(name, addr, router, None, shutdown.clone()));
    }
    servers.spawn(serve("gateway", config.listeners.gateway, gateway, tls, shutdown.clone()));

    let consumer = NotificationConsumer::new(
        state.stores.queue.clone(),
        Arc::new(state.stores.notifications.clone()),
    );
    let consumer_task = tokio::spawn(consumer.run(shutdown.clone()));

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
        }
        signal.cancel();
    });

    let mut outcome = Ok(());
    while let Some(joined) = servers.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                shutdown.cancel();
                if outcome.is_ok() {
                    outcome = Err(e);
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Server task aborted");
                shutdown.cancel();
            }
        }
    }

    shutdown.cancel();
    if let Err(e) = consumer_task.await {
        tracing::error!(error = %e, "Notification consumer task aborted");
    }
    outcome
}

async fn serve(
    service: &'static str,
    addr: SocketAddr,
    router: Router,
    tls: Option<RustlsConfig>,
    shutdown: CancellationToken,
) -> Result<(), RunError> {
    let handle = Handle::new();
    let watcher = handle.clone();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        watcher.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    let scheme = if tls.is_some() { "https" } else { "http" };
    tracing::info!(service, %addr, "Listening on {scheme}://{addr}");

    let served = match tls {
        Some(config) => {
            axum_server::bind_rustls(addr, config)
                .handle(handle)
                .serve(router.into_make_service())
                .await
        }
        None => {
            axum_server::bind(addr)
                .handle(handle)
                .serve(router.into_make_service())
                .await
        }
    };
    served.map_err(|source| RunError::Serve { service, source })
}
