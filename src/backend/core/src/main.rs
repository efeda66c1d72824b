//! ZIGMA Server - local dashboard server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use zigma_core::{
    config::{BackendMode, Config},
    session::{AuthBackend, InMemoryBackend, RestBackend, SessionResolver},
    telemetry,
    web::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let loaded = match std::env::var("ZIGMA_CONFIG") {
        Ok(path) => Config::from_file(&path),
        Err(_) => Config::load(),
    };
    let config = loaded.unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config: {}. Using defaults.", e);
        Config::default()
    });

    // Initialize logging and metrics
    telemetry::init_logging(&config.observability)?;
    let metrics = telemetry::install_recorder()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?config.backend.mode,
        "Starting ZIGMA Server"
    );

    // Create backend
    let backend: Arc<dyn AuthBackend> = match config.backend.mode {
        BackendMode::Memory => {
            tracing::info!("Using the in-memory backend with demo accounts");
            Arc::new(InMemoryBackend::demo())
        }
        BackendMode::Rest => {
            let backend = RestBackend::from_config(&config.backend)?;
            tracing::info!(url = ?config.backend.url, "Using the REST backend");
            Arc::new(backend)
        }
    };

    // Start the session resolver
    let resolver = SessionResolver::create(backend);
    let auth = resolver.handle();
    auth.initialize().await?;
    tracing::info!(status = auth.state().status().as_str(), "Session resolver initialized");

    // Build router
    let app_state = AppState::new(auth, config.auth.oauth_redirect_url.clone()).with_metrics(metrics);
    let app = web::build_router(app_state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!(address = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    resolver.teardown().await;
    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
