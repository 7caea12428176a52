//! # Speech Insight Backend - Main Application Entry Point
//!
//! HTTP backend that accepts an uploaded audio file, delegates transcription
//! to an external speech-to-text API, delegates sentiment/style scoring of
//! the transcript to an external LLM completion API, and returns both
//! results as JSON. The two stages are separate round trips for the caller:
//! `POST /transcribe` first, then `POST /sentiment` with the transcript.
//!
//! ## Key Rust Concepts Used:
//! - **async/await**: The entire application is asynchronous; a request
//!   suspends while awaiting an external response without blocking others
//! - **modules**: Code is organized into separate modules (mod statements)
//! - **Result<T, E>**: Error handling using Rust's Result type
//! - **Arc & RwLock**: Thread-safe shared state management
//!
//! ## Application Architecture:
//! - **config**: Application configuration (TOML files + environment variables)
//! - **state**: Shared application state and metrics
//! - **error**: The error taxonomy and its HTTP mapping
//! - **extract**: JSON extraction from noisy completion text
//! - **storage**: Uploaded-audio persistence with collision-free names
//! - **clients**: Outbound transcription and sentiment clients
//! - **pipeline**: Stage sequencing (persist → transcribe, then analyze)
//! - **handlers**: HTTP request handlers for the API endpoints
//! - **middleware**: Request logging and metrics collection
//! - **health**: System health monitoring endpoints

mod clients;
mod config;
mod error;
mod extract;
mod handlers;
mod health;
mod middleware;
mod pipeline;
mod state;
mod storage;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use crate::config::AppConfig;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Global shutdown signal, set by the signal handler task and polled by the
/// main select loop.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Loads configuration** from files and environment variables
/// 2. **Sets up logging** for debugging and monitoring
/// 3. **Creates shared application state** (including the pipeline with both
///    outbound clients built from the injected configuration)
/// 4. **Configures the HTTP server** with middleware and routes
/// 5. **Handles graceful shutdown** when receiving system signals
#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting speech-insight-backend v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);

    if config.transcription.api_key.is_empty() {
        warn!("No transcription API key configured; /transcribe will fail until one is set");
    }
    if config.sentiment.api_key.is_empty() {
        warn!("No sentiment API key configured; /sentiment will fail until one is set");
    }

    let app_state = AppState::new(config.clone());
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();
    spawn_retention_sweep(&app_state);

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(middleware::RequestObserver)
            // Pipeline endpoints at the root
            .route("/transcribe", web::post().to(handlers::transcribe))
            .route("/sentiment", web::post().to(handlers::sentiment))
            .route("/health", web::get().to(health::health_check))
            // Same surface under the versioned prefix
            .service(
                web::scope("/api/v1")
                    .route("/transcribe", web::post().to(handlers::transcribe))
                    .route("/sentiment", web::post().to(handlers::sentiment))
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics))
                    .route("/config", web::get().to(handlers::get_config)),
            )
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize the tracing (logging) system.
///
/// ## Environment Variables:
/// - `RUST_LOG`: Controls what gets logged (e.g., "debug", "info",
///   "speech_insight_backend=debug")
/// - If not set, defaults to "speech_insight_backend=debug,actix_web=info"
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "speech_insight_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Periodically delete stored uploads older than the configured retention
/// age. Disabled when `storage.retention_minutes` is 0 (the default); the
/// uploads are transient and nothing downstream reads them after
/// transcription.
fn spawn_retention_sweep(app_state: &AppState) {
    let config = app_state.get_config();
    if config.storage.retention_minutes == 0 {
        return;
    }

    let max_age = Duration::from_secs(config.storage.retention_minutes * 60);
    let pipeline = app_state.pipeline.clone();

    tokio::spawn(async move {
        // Sweep at half the retention age so nothing lingers much past it
        let mut interval = tokio::time::interval(max_age / 2);
        loop {
            interval.tick().await;
            match pipeline.store().purge_older_than(max_age).await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "Swept expired uploads"),
                Err(e) => warn!(error = %e, "Upload retention sweep failed"),
            }
        }
    });
}

/// Set up signal handlers for graceful shutdown (SIGTERM and SIGINT).
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Poll the shutdown flag without busy-waiting.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
