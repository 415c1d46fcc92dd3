//! API Server
//!
//! HTTP front end for Redsys card payments.
//!
//! # Features
//!
//! - **Payments**: signed payment forms behind a form nonce
//! - **Callbacks**: customer return and server-to-server notification checks
//! - **OpenAPI**: Auto-generated Swagger documentation
//!
//! # Example
//!
//! ```ignore
//! use api_server::{ApiServer, ServerConfig};
//! use redsys_core::GatewayConfig;
//!
//! let server = ApiServer::new(ServerConfig::from_env(), GatewayConfig::load()?)?;
//! server.run().await?;
//! ```

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod nonce;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use nonce::NonceIssuer;
pub use routes::create_router;
pub use state::AppState;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use redsys_core::GatewayConfig;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Enable CORS for all origins (development only).
    pub cors_permissive: bool,
    /// Secret for form nonces. A random one is generated when unset.
    pub nonce_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_permissive: true,
            nonce_secret: None,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cors_permissive", &self.cors_permissive)
            .field("nonce_secret", &self.nonce_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ServerConfig {
    /// Create from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            // PORT first (PaaS convention), then API_PORT
            port: std::env::var("PORT")
                .or_else(|_| std::env::var("API_PORT"))
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            cors_permissive: std::env::var("CORS_PERMISSIVE")
                .map(|v| v == "true")
                .unwrap_or(true),
            nonce_secret: std::env::var("NONCE_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }

    /// Get the socket address.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }
}

/// The API server.
pub struct ApiServer {
    config: ServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Create a new API server around a validated gateway configuration.
    pub fn new(config: ServerConfig, gateway: GatewayConfig) -> anyhow::Result<Self> {
        let nonces = match &config.nonce_secret {
            Some(secret) => NonceIssuer::new(secret)?,
            None => {
                warn!("NONCE_SECRET not set, nonces will not survive a restart");
                NonceIssuer::random()?
            }
        };

        Ok(Self {
            config,
            state: AppState::new(gateway, nonces),
        })
    }

    /// Run the server.
    pub async fn run(self) -> anyhow::Result<()> {
        let state = Arc::new(self.state);

        let router = create_router(state.clone());
        let router = router
            .layer(
                TraceLayer::new_for_http()
                    .on_request(|request: &Request<_>, _span: &tracing::Span| {
                        tracing::info!(
                            method = %request.method(),
                            path = %request.uri().path(),
                            "Incoming request"
                        );
                    })
                    .on_response(DefaultOnResponse::new().level(Level::DEBUG))
                    .on_failure(
                        |error: tower_http::classify::ServerErrorsFailureClass,
                         latency: std::time::Duration,
                         _span: &tracing::Span| {
                            tracing::error!(
                                error = %error,
                                latency_ms = latency.as_millis(),
                                "Request failed"
                            );
                        },
                    ),
            )
            .layer(DefaultBodyLimit::max(64 * 1024)) // 64 KB
            .layer(if self.config.cors_permissive {
                CorsLayer::permissive()
            } else {
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any)
            });

        let addr = self.config.socket_addr()?;
        info!(
            address = %addr,
            environment = state.gateway.environment.as_str(),
            merchant = %state.gateway.merchant_code,
            "Starting API server"
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
