//! Shared helpers for gateway integration tests.

#![allow(dead_code)]

pub mod mock_upstream;

use readypulse_gateway_lib::models::{CredentialMode, GatewayConfig, UpstreamCredential};
use readypulse_gateway_lib::proxy::GatewayServer;
use tokio::task::JoinHandle;

pub const TEST_API_KEY: &str = "test-key-0123456789";

/// Gateway config pointing at `base_url`, bound to an ephemeral port.
pub fn gateway_config(base_url: &str, credential: Option<&str>) -> GatewayConfig {
    let mut config = GatewayConfig {
        port: 0,
        dist_path: "/nonexistent/readypulse-dist".to_string(),
        credential: credential.and_then(UpstreamCredential::new),
        ..GatewayConfig::default()
    };
    config.upstream.base_url = base_url.to_string();
    config.upstream.credential_mode = CredentialMode::Header;
    config
}

pub struct RunningGateway {
    pub server: GatewayServer,
    handle: JoinHandle<()>,
    client: reqwest::Client,
}

impl RunningGateway {
    pub async fn start(config: GatewayConfig) -> Self {
        let (server, handle) = GatewayServer::start(&config).await.unwrap();
        Self {
            server,
            handle,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.server.local_addr(), path)
    }

    /// POST raw JSON text to the relay route; returns (status, body bytes).
    pub async fn post_raw(&self, body: &str) -> (u16, bytes::Bytes) {
        let response = self
            .client
            .post(self.url("/api/gemini"))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.bytes().await.unwrap())
    }

    pub async fn post_json(&self, body: &serde_json::Value) -> (u16, serde_json::Value) {
        let (status, bytes) = self.post_raw(&body.to_string()).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    pub async fn request(&self, method: reqwest::Method) -> (u16, serde_json::Value) {
        let response = self
            .client
            .request(method, self.url("/api/gemini"))
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    pub async fn shutdown(self) {
        self.server.stop().await;
        let _ = self.handle.await;
    }
}
