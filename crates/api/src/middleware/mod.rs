pub mod body_limit;
pub mod cors;
pub mod request_tracing;

use axum::Router;

use crate::config::AppConfig;

/// The production layer stack around the application router.
pub fn apply(router: Router, config: &AppConfig) -> Router {
    router
        .layer(body_limit::extractor_limit(config.max_body_bytes))
        .layer(body_limit::body_limit_layer(config.max_body_bytes))
        .layer(request_tracing::trace_layer())
        .layer(cors::cors_layer())
}
