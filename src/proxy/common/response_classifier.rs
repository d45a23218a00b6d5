// Upstream response classification
//
// Maps (status, content type) to one of four branches and turns a branch plus
// the raw body into the JSON handed back to the browser. Both steps are pure;
// the I/O lives in the upstream client and the handler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

pub const UPSTREAM_ERROR_MESSAGE: &str = "Upstream error";
pub const NON_JSON_WARNING: &str = "Unexpected non-JSON response from upstream";

/// Max chars of an upstream body echoed into log lines.
pub const LOG_BODY_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// Non-2xx with a JSON content type
    JsonError,
    /// Non-2xx with anything else (HTML error page, plain text, missing header)
    NonJsonError,
    /// 2xx with a JSON content type
    JsonSuccess,
    /// 2xx with anything else
    NonJsonSuccess,
}

/// Normalized outcome returned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResult {
    pub status: StatusCode,
    pub body: Value,
}

impl GatewayResult {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }
}

impl IntoResponse for GatewayResult {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// `application/json` and any `+json` suffix type, parameters ignored.
pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    let Some(raw) = content_type else {
        return false;
    };
    let essence = raw
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

pub fn classify(status: u16, content_type: Option<&str>) -> ResponseClass {
    let json = is_json_content_type(content_type);
    let success = (200..300).contains(&status);
    match (success, json) {
        (false, true) => ResponseClass::JsonError,
        (false, false) => ResponseClass::NonJsonError,
        (true, true) => ResponseClass::JsonSuccess,
        (true, false) => ResponseClass::NonJsonSuccess,
    }
}

/// Build the caller-facing result for a classified upstream body.
///
/// Errors only for a 2xx JSON body that does not parse; the handler reports
/// that as a local gateway failure.
pub fn normalize(
    class: ResponseClass,
    status: u16,
    body: &str,
) -> Result<GatewayResult, serde_json::Error> {
    match class {
        ResponseClass::JsonError => {
            let status = passthrough_status(status);
            match serde_json::from_str::<Value>(body) {
                Ok(parsed) => Ok(GatewayResult::new(status, parsed)),
                Err(_) => Ok(GatewayResult::new(status, json!({ "error": body }))),
            }
        }
        ResponseClass::NonJsonError => Ok(GatewayResult::new(
            StatusCode::BAD_GATEWAY,
            json!({
                "error": UPSTREAM_ERROR_MESSAGE,
                "status": status,
                "body": body,
            }),
        )),
        ResponseClass::JsonSuccess => {
            let parsed = serde_json::from_str::<Value>(body)?;
            Ok(GatewayResult::new(StatusCode::OK, parsed))
        }
        ResponseClass::NonJsonSuccess => Ok(GatewayResult::new(
            StatusCode::OK,
            json!({
                "text": body,
                "warning": NON_JSON_WARNING,
            }),
        )),
    }
}

/// Upstream statuses come off the wire already validated, but a synthetic
/// value outside 100..=999 falls back to 502.
fn passthrough_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
}

/// Truncate to `max_chars` on a char boundary, marking the cut.
pub fn truncate_for_log(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...[truncated {} bytes]", &body[..idx], body.len() - idx),
        None => body.to_string(),
    }
}
