pub mod monitor;

pub use monitor::{monitor_middleware, TraceId, TRACE_ID_HEADER};

use tower_http::cors::{Any, CorsLayer};

/// Permissive CORS so a separately served frontend can call the gateway.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
