//! Turnstile HTTP server: login, token validation and a small protected
//! API, fronted by per-client rate limiting.

pub mod api;
pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod state;

use axum::http::{header, HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;
use crate::state::AppState;

/// Assembles the full application.
///
/// Every `/api` request passes the gate (rate limit, then token checks for
/// protected paths). Anything else is served from the static directory
/// without throttling.
pub fn build_router(state: AppState) -> Router {
    let api = api::router().layer(from_fn_with_state(state.clone(), middleware::gate::gate));

    let base_router = Router::new()
        .nest("/api", api)
        .fallback_service(ServeDir::new(&state.config.static_files.dir));

    let base_router = if state.config.tls.enabled() {
        base_router.layer(from_fn(middleware::security_headers::security_headers_with_hsts))
    } else {
        base_router.layer(from_fn(middleware::security_headers::security_headers))
    };

    base_router
        .layer(RequestBodyLimitLayer::new(state.config.max_body_bytes))
        .layer(cors_layer(&state.config.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    // Same-origin only unless origins are listed.
    if origins.is_empty() {
        cors
    } else {
        cors.allow_origin(origins).allow_credentials(true)
    }
}
