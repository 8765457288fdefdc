//! Router assembly: HTTP endpoints, `/ai` `/users` `/patterns` sub-routers,
//! CORS, HTTP tracing and the JSON 404 fallback.

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};

use crate::config::Settings;
use crate::state::AppState;

pub mod http;
pub mod records;

/// Build the application router with:
/// - pattern API at the root and again under `/ai`
/// - `/users` and `/patterns` record endpoints
/// - CORS per environment
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    let ai = Router::new()
        .route("/generate-pattern", post(http::http_generate_pattern))
        .route("/get-hint", post(http::http_get_hint));

    Router::new()
        .route("/", get(http::http_root))
        .route("/health", get(http::http_health))
        .route("/generate-pattern", post(http::http_generate_pattern))
        .route("/get-hint", post(http::http_get_hint))
        .route("/test-openai", get(http::http_test_openai))
        .nest("/ai", ai)
        .nest("/users", records::user_routes())
        .nest("/patterns", records::pattern_routes())
        .fallback(http::http_not_found)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Production allows only the configured origins; elsewhere any origin is
/// mirrored back. Credentials are allowed in both cases.
pub fn cors_layer(settings: &Settings) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS]);

    if !settings.production {
        return base
            .allow_origin(AllowOrigin::mirror_request())
            .allow_headers(AllowHeaders::mirror_request());
    }

    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(target: "pattern_quiz", origin = %o, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        warn!(target: "pattern_quiz", "Production mode without ALLOWED_ORIGINS; cross-origin requests will be refused");
    }
    base.allow_origin(AllowOrigin::list(origins))
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
