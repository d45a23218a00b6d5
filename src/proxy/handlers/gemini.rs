// Gemini Handler - /api/gemini
//
// Injects the server-held key, forwards the caller's body unchanged and hands
// back whatever upstream said as JSON, whatever shape it came in.

use axum::{
    extract::{rejection::BytesRejection, State},
    http::Method,
    response::{IntoResponse, Response},
    Extension,
};
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::AppState;
use crate::proxy::common::response_classifier::{
    classify, normalize, truncate_for_log, GatewayResult, ResponseClass, LOG_BODY_LIMIT,
};
use crate::proxy::error::GatewayError;
use crate::proxy::middleware::TraceId;

/// Handle any method on the relay route; only POST gets through.
pub async fn handle_generate(
    State(state): State<AppState>,
    trace_id: Option<Extension<TraceId>>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    // The monitor sets this; direct calls outside the router get a fresh one
    let trace_id = trace_id
        .map(|Extension(id)| id)
        .unwrap_or_else(TraceId::generate)
        .0;

    match relay(&state, &method, body, &trace_id).await {
        Ok(result) => result.into_response(),
        Err(e) => {
            match &e {
                GatewayError::MethodNotAllowed | GatewayError::InvalidBody(_) => {
                    debug!("[{}] Rejected {} request: {}", trace_id, method, e)
                }
                GatewayError::MissingCredential => {
                    error!("[{}] No upstream API key configured", trace_id)
                }
                _ => error!("[{}] Gemini proxy error: {}", trace_id, e),
            }
            e.into_response()
        }
    }
}

async fn relay(
    state: &AppState,
    method: &Method,
    body: Result<Bytes, BytesRejection>,
    trace_id: &str,
) -> Result<GatewayResult, GatewayError> {
    if *method != Method::POST {
        return Err(GatewayError::MethodNotAllowed);
    }

    let credential = state
        .credential
        .as_deref()
        .ok_or(GatewayError::MissingCredential)?;

    let body = body.map_err(|rejection| GatewayError::BodyRejected {
        status: rejection.status(),
        message: rejection.body_text(),
    })?;
    let payload = parse_payload(&body)?;

    info!(
        "[{}] Gemini Request → {}",
        trace_id,
        state.upstream.endpoint()
    );

    let reply = state.upstream.generate(credential, &payload).await?;
    let class = classify(reply.status, reply.content_type.as_deref());

    match class {
        ResponseClass::JsonError | ResponseClass::NonJsonError => error!(
            "[{}] Upstream returned {} ({}): {}",
            trace_id,
            reply.status,
            reply.content_type.as_deref().unwrap_or("-"),
            truncate_for_log(&reply.body, LOG_BODY_LIMIT)
        ),
        ResponseClass::NonJsonSuccess => warn!(
            "[{}] Unexpected non-JSON response from upstream ({}): {}",
            trace_id,
            reply.content_type.as_deref().unwrap_or("-"),
            truncate_for_log(&reply.body, LOG_BODY_LIMIT)
        ),
        ResponseClass::JsonSuccess => {
            debug!("[{}] Upstream returned {}", trace_id, reply.status)
        }
    }

    Ok(normalize(class, reply.status, &reply.body)?)
}

/// An empty body forwards as `{}`; anything else must be JSON.
fn parse_payload(body: &[u8]) -> Result<Value, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|e| GatewayError::InvalidBody(e.to_string()))
}
