//! # Quick Shield Backend - Main Application Entry Point
//!
//! An Actix-web server that backs the Quick Shield front end:
//!
//! - `POST /upload` stores a voice recording sent as multipart form data
//! - `POST /quick-shield` records a Quick Shield activation as a JSON file
//! - `GET /` and every other path serve the front end from `public/`
//! - `GET /health` and `/api/v1/metrics` report on the service itself
//!
//! ## Application Architecture:
//! - **config**: Configuration from defaults, config.toml and environment variables
//! - **storage**: Recordings and alerts stores plus the identifier generator
//! - **records**: The alert JSON types
//! - **state**: Shared state injected into every handler
//! - **handlers**: HTTP request handlers and route registration
//! - **health**: Health and metrics endpoints
//! - **middleware**: Request logging and metrics collection
//! - **error**: Error types and their JSON responses

mod config;
mod error;
mod handlers;
mod health;
mod middleware;
mod records;
mod state;
mod storage;
#[cfg(test)]
mod test_support;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{Context, Result};
use crate::config::AppConfig;
use crate::state::AppState;
use std::future::Future;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Loads configuration** from files and environment variables
/// 2. **Sets up logging**
/// 3. **Creates the storage directories** if they are missing
/// 4. **Starts the HTTP server** with middleware and routes
/// 5. **Stops gracefully** on SIGINT or SIGTERM, letting in-flight uploads finish
#[actix_web::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate()?;

    info!("Starting quick-shield-backend v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);

    let app_state = AppState::new(config.clone());
    app_state.paths.ensure_dirs()?;
    info!(
        recordings = %app_state.paths.recordings.display(),
        alerts = %app_state.paths.alerts.display(),
        "Storage ready"
    );
    if !app_state.paths.public.is_dir() {
        warn!(dir = %app_state.paths.public.display(), "Public directory not found; static pages will 404");
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let shutdown = shutdown_signal()?;

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let paths = app_state.paths.clone();
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .configure(|cfg| handlers::configure(cfg, &paths))
    })
    // Signals are handled below so the shutdown is logged the same way everywhere.
    .disable_signals()
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = shutdown => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize tracing.
///
/// ## Environment Variables:
/// - `RUST_LOG`: Controls what gets logged (e.g. "debug", "quick_shield_backend=trace")
/// - If not set, defaults to "quick_shield_backend=debug,actix_web=info"
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quick_shield_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("Failed to initialize tracing")?;

    Ok(())
}

/// Install SIGTERM/SIGINT handlers and return a future that resolves on the first signal.
///
/// Handlers are installed eagerly so a failure surfaces at startup rather
/// than when someone tries to stop the server.
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }
    })
}
