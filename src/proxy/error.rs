// Gateway error taxonomy
//
// Every failure the gateway detects itself is rendered as JSON with a
// synthesized status. Upstream HTTP errors are not here: those are passed
// through or wrapped by the response classifier.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub const METHOD_NOT_ALLOWED_MESSAGE: &str = "Method not allowed";
pub const MISSING_API_KEY_MESSAGE: &str = "Missing API key";

/// Transport-level failure talking to upstream.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{0}")]
    Request(#[source] reqwest::Error),
    #[error("failed to read upstream body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("invalid upstream url: {0}")]
    Url(#[from] url::ParseError),
    #[error("upstream response exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl UpstreamError {
    /// Connect failures and timeouts are the only retryable class.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Missing API key")]
    MissingCredential,
    #[error("Invalid JSON body: {0}")]
    InvalidBody(String),
    /// Body could not be read (over the size limit, aborted upload)
    #[error("{message}")]
    BodyRejected { status: StatusCode, message: String },
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("Malformed JSON from upstream: {0}")]
    MalformedUpstreamJson(#[from] serde_json::Error),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::BodyRejected { status, .. } => *status,
            Self::MissingCredential | Self::Upstream(_) | Self::MalformedUpstreamJson(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
