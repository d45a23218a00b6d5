// Request monitor middleware
use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;

pub const TRACE_ID_HEADER: &str = "x-request-id";

/// Per-request id, set by the monitor and read by handlers for their log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceId(pub String);

impl TraceId {
    pub fn generate() -> Self {
        Self(format!("gemini_{}", &uuid::Uuid::new_v4().simple().to_string()[..8]))
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client IP from proxy headers, first hop wins.
pub fn client_ip(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
        })
}

/// Logs trace id, method, path, status and latency for gateway traffic, and
/// echoes the trace id back in `x-request-id`.
///
/// Only the path is logged, never the query string.
pub async fn monitor_middleware(mut request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    // Health probes and static assets stay quiet
    if !path.starts_with("/api/") {
        return next.run(request).await;
    }

    let start = Instant::now();
    let trace_id = TraceId::generate();
    request.extensions_mut().insert(trace_id.clone());
    let ip = client_ip(request.headers()).or_else(|| {
        request
            .extensions()
            .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
            .map(|info| info.0.ip().to_string())
    });

    let mut response = next.run(request).await;

    let duration = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    tracing::info!(
        "[Monitor] [{}] {} {} → {} ({}ms) client_ip={}",
        trace_id,
        method,
        path,
        status,
        duration,
        ip.as_deref().unwrap_or("-"),
    );

    if let Ok(value) = HeaderValue::from_str(&trace_id.0) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}
