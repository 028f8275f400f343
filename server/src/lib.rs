//! Complaint Desk server wiring.
//!
//! [`run`] owns the process lifecycle:
//!
//! 1. Connect the `PostgreSQL` pool and apply the schema
//! 2. Install the Prometheus recorder and serve `/metrics`
//! 3. Wire the stores, realtime hub and lifecycle service
//! 4. Serve HTTP until Ctrl+C or SIGTERM
//! 5. Drain in-flight side effects, stop the metrics listener, close the pool

pub mod config;

use anyhow::Context;
use axum::{Router, routing::get};
use complaint_desk_core::environment::SystemClock;
use complaint_desk_postgres::{PostgresAggregateStore, PostgresNotifications, migrate};
use complaint_desk_runtime::metrics::MetricsServer;
use complaint_desk_runtime::{ComplaintLifecycleService, LifecycleEnvironment};
use complaint_desk_web::{AppState, RealtimeHub, build_router};
use config::Config;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,complaint_desk=debug,sqlx=warn";

/// Install the global tracing subscriber.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Run the server until a shutdown signal arrives.
///
/// # Errors
///
/// Fails if the database is unreachable, the schema cannot be applied, the
/// metrics recorder cannot be installed or a listener cannot bind.
pub async fn run(config: Config) -> anyhow::Result<()> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout))
        .connect(&config.database.url)
        .await
        .context("failed to connect to PostgreSQL")?;

    migrate(&pool).await.context("failed to apply schema")?;
    info!("Database ready");

    let metrics_addr = config
        .metrics_addr()
        .context("invalid METRICS_HOST/METRICS_PORT")?;
    let mut metrics = MetricsServer::new(metrics_addr);
    metrics.start()?;
    let metrics_task = spawn_metrics_listener(&metrics).await?;

    let hub = RealtimeHub::new(config.lifecycle.realtime_channel_capacity);
    let notifications = Arc::new(PostgresNotifications::from_pool(pool.clone()));
    let service = ComplaintLifecycleService::new(
        LifecycleEnvironment {
            store: Arc::new(PostgresAggregateStore::from_pool(pool.clone())),
            notifier: notifications.clone(),
            inbox: notifications,
            broadcaster: Arc::new(hub.clone()),
            clock: Arc::new(SystemClock),
        },
        config.lifecycle_config(),
    );

    let app = build_router(AppState::new(service.clone(), hub));

    let addr = config.http_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped, draining side effects");
    if let Err(e) = service.dispatcher().drain(config.shutdown_timeout()).await {
        warn!(error = %e, "Shutting down with side effects still in flight");
    }

    metrics_task.abort();
    pool.close().await;
    info!("Shutdown complete");
    Ok(())
}

/// Serve `GET /metrics` on the metrics address in a background task.
async fn spawn_metrics_listener(
    metrics: &MetricsServer,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let handle = metrics.handle().cloned();
    let router = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.map(|h| h.render()).unwrap_or_default() }
        }),
    );

    let listener = tokio::net::TcpListener::bind(metrics.addr())
        .await
        .with_context(|| format!("failed to bind metrics listener {}", metrics.addr()))?;
    info!(address = %metrics.addr(), "Metrics listening");

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!(error = %e, "Metrics listener failed");
        }
    }))
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C signal, shutting down gracefully..."),
        () = terminate => info!("Received SIGTERM signal, shutting down gracefully..."),
    }
}
