//! Mock generative-language upstream for integration testing.
//!
//! Answers every `generateContent` call with a configurable status, content
//! type, body and delay, and records what the gateway sent.

#![allow(dead_code)]

use axum::{
    body::{Body, Bytes},
    extract::{Path, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::post,
    Router,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// What the mock answers with.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    pub delay: Option<Duration>,
    pub headers: Vec<(String, String)>,
}

impl Scenario {
    pub fn new(status: u16, content_type: Option<&str>, body: &str) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body: body.to_string(),
            delay: None,
            headers: Vec::new(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }
}

/// One request as seen by the mock.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub model_action: String,
    pub query: Option<String>,
    pub api_key_header: Option<String>,
    pub content_type: Option<String>,
    pub body: Value,
}

#[derive(Debug)]
struct MockState {
    scenario: RwLock<Scenario>,
    hits: AtomicUsize,
    last_request: RwLock<Option<CapturedRequest>>,
}

pub struct MockUpstream {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockUpstream {
    /// Start on an ephemeral port, answering 200 `{}` until told otherwise.
    pub async fn start() -> Self {
        let state = Arc::new(MockState {
            scenario: RwLock::new(Scenario::new(200, Some("application/json"), "{}")),
            hits: AtomicUsize::new(0),
            last_request: RwLock::new(None),
        });

        let app = Router::new()
            .route("/v1beta/models/:model_action", post(handle))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/v1beta", self.addr)
    }

    pub async fn respond(&self, scenario: Scenario) {
        *self.state.scenario.write().await = scenario;
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub async fn last_request(&self) -> Option<CapturedRequest> {
        self.state.last_request.read().await.clone()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    Path(model_action): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    *state.last_request.write().await = Some(CapturedRequest {
        model_action,
        query,
        api_key_header: header("x-goog-api-key"),
        content_type: header("content-type"),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let scenario = state.scenario.read().await.clone();
    if let Some(delay) = scenario.delay {
        tokio::time::sleep(delay).await;
    }

    let mut builder =
        Response::builder().status(StatusCode::from_u16(scenario.status).unwrap());
    if let Some(ct) = scenario.content_type {
        builder = builder.header("content-type", ct);
    }
    for (name, value) in &scenario.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.body(Body::from(scenario.body)).unwrap()
}
