use tower_http::cors::{Any, CorsLayer};

/// The web and mobile clients call from arbitrary origins.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
