//! Router assembly and HTTP server startup (C8).

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api;
use crate::sse;
use crate::state::AppState;

/// Bind address/port, kept separate from [`crate::state::GatewayConfig`]
/// since it governs the listener, not turn behaviour.
#[derive(Debug, Clone)]
pub struct WebConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Allowed CORS origins (§6's `CORS_ORIGINS`). Empty means "allow any."
    pub cors_origins: Vec<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0".to_owned(), port: 8080, cors_origins: Vec::new() }
    }
}

/// The conversation gateway's HTTP server.
pub struct WebServer {
    config: WebConfig,
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(config: WebConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.bind_addr, self.config.port)
    }

    fn router(&self) -> Router {
        let cors = if self.config.cors_origins.is_empty() {
            CorsLayer::new().allow_origin(tower_http::cors::Any).allow_methods([Method::GET, Method::POST])
        } else {
            let origins: Vec<HeaderValue> = self
                .config
                .cors_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect();
            CorsLayer::new().allow_origin(origins).allow_methods([Method::GET, Method::POST])
        };

        Router::new()
            .route("/api/health", get(api::health))
            .route("/api/conversation", post(api::conversation))
            .route("/api/conversation/stream", post(sse::stream_conversation))
            .layer(cors)
            .with_state(Arc::clone(&self.state))
    }

    /// Start the server and block until it is shut down.
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.addr();
        let router = self.router();

        tracing::info!(addr = %addr, "starting conversation gateway");

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
