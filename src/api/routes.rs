use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    demo_business_error, demo_create_user, demo_echo, demo_info, demo_panic, demo_param,
    demo_slow, demo_success, demo_system_error, health, method_not_allowed, not_found, AppState,
};
use super::middleware::logging_middleware;
use super::openapi::ApiDoc;
use crate::config::CorsConfig;
use crate::errors::dispatch::handle_panic;
use crate::metrics;

pub fn create_router(state: AppState, cors: &CorsConfig) -> Router {
    let api = Router::new()
        // Health check
        .route("/api/health", get(health))
        // Demo endpoints
        .route("/api/demo/success", get(demo_success))
        .route("/api/demo/echo", get(demo_echo))
        .route("/api/demo/error/biz", get(demo_business_error))
        .route("/api/demo/error/system", get(demo_system_error))
        .route("/api/demo/error/param", get(demo_param))
        .route("/api/demo/error/panic", get(demo_panic))
        .route("/api/demo/users", post(demo_create_user))
        .route("/api/demo/slow", get(demo_slow))
        .route("/api/demo/info", get(demo_info))
        .layer(cors_layer(cors));

    Router::new()
        .merge(api)
        // Metrics endpoint (Prometheus)
        .route("/metrics", get(metrics::metrics_handler))
        // OpenAPI documentation
        .merge(SwaggerUi::new("/api/doc").url("/api/doc/openapi.json", ApiDoc::openapi()))
        // Known path, unsupported method
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        // Add middleware (order matters: panics are turned into envelopes before
        // compression, logging, metrics and tracing see the response)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics::middleware::track_metrics))
        .layer(TraceLayer::new_for_http())
        // Add shared state
        .with_state(state)
}

/// CORS for the `/api` routes. Credentials are allowed, so wildcards are
/// expressed by mirroring the request instead of `*`.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.allowed_origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(
            config
                .allowed_origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .max_age(Duration::from_secs(config.max_age_seconds))
}
