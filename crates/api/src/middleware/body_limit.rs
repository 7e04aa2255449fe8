use axum::extract::DefaultBodyLimit;
use tower_http::limit::RequestBodyLimitLayer;

/// Cap request bodies; chat images travel inline as base64.
pub fn body_limit_layer(max_bytes: usize) -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(max_bytes)
}

/// Extractors buffer at most 2 MB unless told otherwise. Lift that to the
/// same cap as [`body_limit_layer`].
pub fn extractor_limit(max_bytes: usize) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max_bytes)
}
