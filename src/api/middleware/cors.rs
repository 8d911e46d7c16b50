//! CORS configuration for the graph editor frontend.

use tower_http::cors::CorsLayer;

/// Permissive CORS: the editor and this API are not assumed to share an
/// origin, and the API carries no cookie-based auth to protect.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}
