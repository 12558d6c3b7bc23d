//! Router construction and the serve loop

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use thiserror::Error;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use veil_core::VendorRegistry;
use veil_gateway::QueryGateway;

use crate::api;

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid CORS origin: {0}")]
    InvalidOrigin(String),

    #[error("Failed to bind {0}: {1}")]
    Bind(SocketAddr, std::io::Error),

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<QueryGateway>,
    pub vendors: Arc<VendorRegistry>,
}

impl AppState {
    pub fn new(gateway: QueryGateway, vendors: VendorRegistry) -> Self {
        Self {
            gateway: Arc::new(gateway),
            vendors: Arc::new(vendors),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address
    pub bind: SocketAddr,
    /// Single browser origin allowed by CORS
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}

/// Build the axum router with all API routes
pub fn build_router(state: AppState, cors_origin: &str) -> Result<Router, ServerError> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .map_err(|_| ServerError::InvalidOrigin(cors_origin.to_string()))?;

    // Credentials rule out wildcards, so methods and headers mirror the request
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(origin))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Ok(Router::new()
        .route("/api/v2/chat/message", post(api::chat_message))
        .route("/api/v1/vendors", get(api::list_vendors))
        .route("/api/v1/vendors/{vendor_id}", get(api::get_vendor))
        .route("/api/health", get(api::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Serve until Ctrl-C
pub async fn serve(state: AppState, config: ServerConfig) -> Result<(), ServerError> {
    let router = build_router(state, &config.cors_origin)?;
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| ServerError::Bind(config.bind, e))?;

    info!("Listening on http://{}", config.bind);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
