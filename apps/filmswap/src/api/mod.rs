//! # filmswap HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Participant Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /swap` - Current period and counts
//! - `POST /swap` - Create the swap
//! - `POST /participants` - Join
//! - `PUT /participants/{id}/letter` - Write a letter
//! - `PUT /participants/{id}/gift` - Submit a gift
//! - `PUT /participants/{id}/name` - Update the display name
//! - `POST /participants/{id}/done` - Mark done watching
//! - `DELETE /participants/{id}` - Leave
//! - `GET /participants/{id}/giftee-letter` - Read the giftee's letter
//! - `GET /participants/{id}/gift` - Read the received gift
//!
//! ## Admin Endpoints (Bearer token when an api key is configured)
//!
//! - `POST /admin/match`, `POST /admin/unmatch`
//! - `POST /admin/ban`, `POST /admin/unban`
//! - `POST /admin/period`, `POST /admin/reveal`
//! - `GET /admin/summary`

mod auth;
mod handlers;
mod types;

pub use auth::{keys_match, require_api_key};
pub use handlers::{ApiError, status_for};
pub use types::{
    DoneRequest, ErrorResponse, HealthResponse, JoinRequest, MatchResponse, PeriodRequest,
    RevealRequest, TargetRequest, TextRequest,
};

use crate::Engine;
use crate::config::Settings;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use filmswap_core::{GraphLayout, SwapError};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted request body. Letters and gifts are capped far below it.
const MAX_BODY_SIZE: usize = 64 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
///
/// The engine serializes its own mutations, so handlers share it behind a
/// plain `Arc` and reach it through [`AppState::run`].
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub api_key: Option<String>,
    pub disable_unmatch: bool,
    pub period_post_hook: bool,
    pub default_layout: GraphLayout,
}

impl AppState {
    /// Wrap an engine with the request-time settings.
    #[must_use]
    pub fn new(engine: Engine, settings: &Settings) -> Self {
        Self {
            engine: Arc::new(engine),
            api_key: settings.api_key().map(str::to_string),
            disable_unmatch: settings.disable_unmatch,
            period_post_hook: settings.period_post_hook,
            default_layout: settings.default_layout,
        }
    }

    /// Run an engine call on the blocking pool.
    ///
    /// Engine calls take std locks and may hit redb on disk, neither of
    /// which belongs on an async worker thread.
    pub async fn run<T, F>(&self, call: F) -> Result<T, SwapError>
    where
        F: FnOnce(&Engine) -> Result<T, SwapError> + Send + 'static,
        T: Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || call(&engine))
            .await
            .map_err(|e| SwapError::StorageError(format!("engine task failed: {e}")))?
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// CORS layer for the configured origins.
///
/// - `["*"]`: any origin
/// - empty: localhost only
/// - otherwise: the listed origins; unparsable entries are skipped
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: allowing ALL origins, do not use this in production");
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(hv) => Some(hv),
            Err(e) => {
                tracing::warn!("CORS: invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    let allowed = if allowed.is_empty() {
        ["http://localhost:8080", "http://127.0.0.1:8080"]
            .into_iter()
            .filter_map(|o| o.parse::<HeaderValue>().ok())
            .collect()
    } else {
        allowed
    };

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Authentication - `/admin/*` only
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    if state.api_key.is_some() {
        tracing::info!("API key authentication enabled for /admin");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - admin endpoints are publicly accessible! \
             Set FILMSWAP_API_KEY to enable authentication."
        );
    }

    let admin = Router::new()
        .route("/match", post(handlers::match_handler))
        .route("/unmatch", post(handlers::unmatch_handler))
        .route("/ban", post(handlers::ban_handler))
        .route("/unban", post(handlers::unban_handler))
        .route("/period", post(handlers::period_handler))
        .route("/reveal", post(handlers::reveal_handler))
        .route("/summary", get(handlers::summary_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/swap",
            get(handlers::swap_info_handler).post(handlers::create_swap_handler),
        )
        .route("/participants", post(handlers::join_handler))
        .route("/participants/{id}", delete(handlers::leave_handler))
        .route("/participants/{id}/letter", put(handlers::letter_handler))
        .route(
            "/participants/{id}/gift",
            put(handlers::gift_handler).get(handlers::received_gift_handler),
        )
        .route("/participants/{id}/name", put(handlers::rename_handler))
        .route("/participants/{id}/done", post(handlers::done_handler))
        .route(
            "/participants/{id}/giftee-letter",
            get(handlers::giftee_letter_handler),
        )
        .nest("/admin", admin)
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(cors_origins)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and run until Ctrl+C.
pub async fn run_server(
    addr: &str,
    state: AppState,
    cors_origins: &[String],
) -> Result<(), SwapError> {
    let router = create_router(state, cors_origins);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| SwapError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("filmswap HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| SwapError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
