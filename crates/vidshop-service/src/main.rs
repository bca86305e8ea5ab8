//! vidshop service - HTTP API for the video storefront.
//!
//! This is the main entry point for the vidshop service.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidshop_service::{create_router, AppState, ServiceConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,vidshop=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting vidshop service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        db_path = %config.db_path,
        admins = config.admin_user_ids.len(),
        fetch_deadline_seconds = config.fetch_deadline_seconds,
        max_upload_bytes = config.max_upload_bytes,
        relay_configured = config.relay_url.is_some(),
        api_key_configured = config.service_api_key.is_some(),
        "Service configuration loaded"
    );

    if config.service_api_key.is_none() {
        tracing::warn!("SERVICE_API_KEY not set - every /v1 request will be rejected");
    }

    let state = AppState::from_config(config.clone()).await?;

    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
