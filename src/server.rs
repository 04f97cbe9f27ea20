//! HTTP chat API.
//!
//! `POST /api/chat` answers one question through the [`RagEngine`];
//! `GET /` reports liveness. The server starts even when the model or store
//! clients cannot be built and then answers chat requests with a generic
//! error until restarted with a working configuration.

use crate::config::Settings;
use crate::error::Result;
use crate::rag::RagEngine;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Message returned for every failure in the chat path.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Whether the chat path can serve requests.
pub enum Backend {
    Ready(RagEngine),
    /// Client construction failed at startup; holds the reason for logs.
    Degraded(String),
}

impl Backend {
    /// Build the RAG engine, falling back to the degraded state on failure.
    pub async fn from_settings(settings: &Settings) -> Self {
        match RagEngine::from_settings(settings).await {
            Ok(engine) => Backend::Ready(engine),
            Err(e) => {
                warn!("Starting in degraded mode: {}", e);
                Backend::Degraded(e.to_string())
            }
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Backend::Ready(_) => "ready",
            Backend::Degraded(_) => "degraded",
        }
    }
}

/// Shared application state.
pub struct AppState {
    pub backend: Backend,
}

impl AppState {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub backend: String,
}

/// Build the router with CORS restricted to `cors_origins`.
pub fn router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/chat", post(chat))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}

/// CORS for browser front-ends on the listed origins, with credentials.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match normalize_origin(origin) {
            Some(value) => HeaderValue::from_str(&value).ok(),
            None => {
                warn!("Ignoring invalid CORS origin: {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
}

/// Reduce an origin to `scheme://host[:port]`, the form browsers send.
pub fn normalize_origin(origin: &str) -> Option<String> {
    let url = url::Url::parse(origin.trim()).ok()?;
    let origin = url.origin();
    if origin.is_tuple() {
        Some(origin.ascii_serialization())
    } else {
        None
    }
}

/// Bind and serve until Ctrl+C.
pub async fn run(host: &str, port: u16, state: Arc<AppState>, cors_origins: &[String]) -> Result<()> {
    let app = router(state, cors_origins);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "Server is running".to_string(),
        backend: state.backend.status().to_string(),
    })
}

async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Response {
    if req.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Message must not be empty".to_string(),
            }),
        )
            .into_response();
    }

    let engine = match &state.backend {
        Backend::Ready(engine) => engine,
        Backend::Degraded(reason) => {
            error!("Chat request rejected, backend unavailable: {}", reason);
            return internal_error();
        }
    };

    match engine.ask(&req.message).await {
        Ok(response) => Json(ChatResponse {
            reply: response.reply,
        })
        .into_response(),
        Err(e) => {
            error!("Chat request failed: {}", e);
            internal_error()
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: INTERNAL_ERROR_MESSAGE.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_origin() {
        assert_eq!(
            normalize_origin("http://localhost:3000/").as_deref(),
            Some("http://localhost:3000")
        );
        assert_eq!(
            normalize_origin(" https://example.com:443/app ").as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            normalize_origin("HTTP://Example.COM:8080").as_deref(),
            Some("http://example.com:8080")
        );
        assert!(normalize_origin("not a url").is_none());
        assert!(normalize_origin("").is_none());
    }

    #[test]
    fn test_backend_status() {
        assert_eq!(Backend::Degraded("no key".to_string()).status(), "degraded");
    }
}
