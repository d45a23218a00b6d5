// Handlers module - API endpoint processors
//
// - POST /api/gemini → generateContent relay

pub mod gemini;

use std::sync::Arc;

use crate::models::UpstreamCredential;
use crate::proxy::upstream::UpstreamClient;

/// Shared application state for Axum handlers
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamClient>,
    /// `None` when the key was not configured; requests then fail with 500.
    pub credential: Option<Arc<UpstreamCredential>>,
}

impl AppState {
    pub fn new(upstream: Arc<UpstreamClient>, credential: Option<UpstreamCredential>) -> Self {
        Self {
            upstream,
            credential: credential.map(Arc::new),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }
}
