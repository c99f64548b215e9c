//! Invoicing API Server Binary
//!
//! Starts the HTTP API and the periodic reminder sweep.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin invoicing-api
//!
//! # Run with environment variables
//! API_PORT=8080 API_DATABASE_URL=postgres://... API_TIMEZONE=Europe/Madrid cargo run --bin invoicing-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` / `API_PORT` - Bind address (default: 0.0.0.0:8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_DATABASE_URL` - PostgreSQL connection string (`DATABASE_URL` also accepted)
//! * `API_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! * `API_LOG_JSON` - `true` for JSON log lines
//! * `API_TIMEZONE` - IANA zone that defines "today" (default: UTC)
//! * `API_REMINDER_SWEEP_INTERVAL_SECS` - Sweep period, 0 disables it (default: 3600)
//! * `API_REQUIRE_LEGAL_NAME` / `API_REQUIRE_TAX_ID` / `API_REQUIRE_ADDRESS` - Fiscal fields checked at issuance
//! * `API_REMINDER_OFFSETS` - Rule table override, e.g. `before_3:-3,due_day:0,after_7:7`

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use interface_api::{config::ApiConfig, create_router, scheduler, AppState};
use infra_db::{create_pool, run_migrations, DatabaseConfig};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = load_config()?;

    init_tracing(&config.log_level, config.log_json);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        timezone = %config.timezone,
        "Starting invoicing API server"
    );

    let pool = create_pool(DatabaseConfig::new(config.database_url.clone()))
        .await
        .context("Failed to connect to the database")?;
    run_migrations(&pool).await.context("Failed to run migrations")?;

    let state = AppState::postgres(pool, config.clone()).context("Invalid invoicing configuration")?;

    let sweep = if config.reminder_sweep_interval_secs > 0 {
        Some(scheduler::spawn_reminder_sweep(
            state.reminders.clone(),
            Duration::from_secs(config.reminder_sweep_interval_secs),
        ))
    } else {
        tracing::info!("Reminder sweep disabled");
        None
    };

    let app = create_router(state);
    let addr: SocketAddr = config.server_addr().parse().context("Invalid bind address")?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sweep) = sweep {
        sweep.abort();
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Loads `API_`-prefixed configuration, accepting a plain `DATABASE_URL`
fn load_config() -> anyhow::Result<ApiConfig> {
    let mut config = ApiConfig::from_env().context("Invalid API_ configuration")?;
    if std::env::var("API_DATABASE_URL").is_err() {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }
    }
    Ok(config)
}

/// Initializes the tracing subscriber for structured logging
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Waits for Ctrl+C or SIGTERM
///
/// If a handler cannot be installed that signal is never awaited; the other
/// one still triggers shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
