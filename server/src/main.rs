//! Townsquare Server - Main entry point.
//!
//! This binary starts the Townsquare event board server with:
//! - Structured JSON logging for production
//! - Graceful shutdown handling (SIGTERM/SIGINT)
//!
//! # Configuration
//!
//! See [`townsquare_server::config`] for environment variable configuration.
//!
//! # Example
//!
//! ```bash
//! # Development mode (volatile store, no MongoDB required)
//! TOWNSQUARE_JWT_SECRET=dev-secret \
//! TOWNSQUARE_MEMORY_STORE=true \
//! cargo run --bin townsquare-server
//!
//! # Production mode
//! TOWNSQUARE_JWT_SECRET="change-me" \
//! TOWNSQUARE_MONGODB_URI="mongodb://localhost:27017" \
//! PORT=8080 \
//! cargo run --release --bin townsquare-server
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use townsquare_server::config::Config;
use townsquare_server::routes::{create_router, AppState};
use townsquare_server::store::{MemoryStore, MongoStore, Store};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize structured logging
    init_logging();

    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Failed to load configuration");
            eprintln!("Error: {err}");
            eprintln!();
            eprintln!("Required environment variables:");
            eprintln!("  TOWNSQUARE_JWT_SECRET    - Shared secret for identity tokens");
            eprintln!();
            eprintln!("Optional environment variables:");
            eprintln!("  TOWNSQUARE_MONGODB_URI   - MongoDB URI (default: mongodb://localhost:27017)");
            eprintln!("  TOWNSQUARE_DATABASE      - Database name (default: townsquare)");
            eprintln!("  TOWNSQUARE_CORS_ORIGIN   - Allowed CORS origins (default: *)");
            eprintln!("  TOWNSQUARE_MEMORY_STORE  - Use volatile store (dev only, set to 'true')");
            eprintln!("  PORT                     - HTTP server port (default: 8080)");
            eprintln!("  RUST_LOG                 - Log level filter (default: info)");
            return ExitCode::from(1);
        }
    };

    // Connect the document store
    let store: Arc<dyn Store> = if config.memory_store {
        info!("Using in-memory document store");
        Arc::new(MemoryStore::new())
    } else {
        match MongoStore::connect(&config.mongodb_uri, &config.database).await {
            Ok(store) => Arc::new(store),
            Err(err) => {
                error!(
                    error = %err,
                    uri = %config.mongodb_uri,
                    "Failed to connect to MongoDB"
                );
                return ExitCode::from(1);
            }
        }
    };

    info!(
        port = config.port,
        database = %config.database,
        "Townsquare server starting"
    );

    // Create application state and router
    let state = AppState::new(config.clone(), store);
    let app = create_router(state);

    // Bind to address
    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => {
            info!(
                port = config.port,
                address = %bind_addr,
                "Server listening"
            );
            listener
        }
        Err(err) => {
            error!(
                error = %err,
                address = %bind_addr,
                "Failed to bind to address"
            );
            return ExitCode::from(1);
        }
    };

    // Start server with graceful shutdown
    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    info!("Server ready to accept connections");

    if let Err(err) = server.await {
        error!(error = %err, "Server error");
        return ExitCode::from(1);
    }

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}

/// Initialize structured logging with tracing.
///
/// Configures JSON-formatted output for production use with:
/// - Environment-based log level filtering via RUST_LOG
/// - Default log level of `info`
/// - Target and level information
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Default: info level for our crates, warn for dependencies
        EnvFilter::new("info,tower_http=debug,axum::rejection=trace")
    });

    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .init();
}

/// Creates a future that resolves when a shutdown signal is received.
///
/// Listens for:
/// - SIGTERM (container orchestrator shutdown)
/// - SIGINT (Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
