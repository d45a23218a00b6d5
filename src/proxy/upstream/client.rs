// Upstream client
// reqwest wrapper for the generative-language generateContent endpoint, with
// credential injection, optional outbound proxy and bounded transport retry

use reqwest::{header, Client};
use serde_json::Value;
use tokio::time::Duration;
use url::Url;

use crate::models::{CredentialMode, UpstreamConfig, UpstreamCredential, UpstreamProxyConfig};
use crate::proxy::error::UpstreamError;

const DEFAULT_USER_AGENT: &str = "readypulse-gateway/1.0";

/// Header used when the credential travels out of band.
pub const API_KEY_HEADER: &str = "x-goog-api-key";
/// Query parameter used in `CredentialMode::Query`.
pub const API_KEY_QUERY_PARAM: &str = "key";

/// Raw upstream reply, body fully read.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamReply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// Ensure a proxy URL has a scheme
pub fn normalize_proxy_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.starts_with("http://")
        || trimmed.starts_with("https://")
        || trimmed.starts_with("socks5://")
        || trimmed.starts_with("socks5h://")
    {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Exponential backoff: base_ms * 2^attempt, capped at max_ms
pub fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let factor = 2u64.saturating_pow(attempt);
    Duration::from_millis(base_ms.saturating_mul(factor).min(max_ms))
}

pub struct UpstreamClient {
    client: Client,
    endpoint: Url,
    credential_mode: CredentialMode,
    max_retries: u32,
    retry_base_ms: u64,
    retry_max_ms: u64,
    max_response_bytes: usize,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = Self::build_client_internal(config).map_err(UpstreamError::Client)?;
        let endpoint = Self::build_url(&config.base_url, &config.model)?;

        Ok(Self {
            client,
            endpoint,
            credential_mode: config.credential_mode,
            max_retries: config.max_retries,
            retry_base_ms: config.retry_base_ms,
            retry_max_ms: config.retry_max_ms,
            max_response_bytes: config.max_response_bytes,
        })
    }

    fn build_client_internal(config: &UpstreamConfig) -> Result<Client, reqwest::Error> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(DEFAULT_USER_AGENT)
            // A 3xx is classified like any other non-2xx; following it would
            // also replay the key header to the redirect target
            .redirect(reqwest::redirect::Policy::none());

        if let Some(proxy) = Self::build_proxy(&config.proxy) {
            builder = builder.proxy(proxy);
        }

        builder.build()
    }

    fn build_proxy(proxy_config: &UpstreamProxyConfig) -> Option<reqwest::Proxy> {
        if !proxy_config.enabled || proxy_config.url.trim().is_empty() {
            return None;
        }
        let url = normalize_proxy_url(&proxy_config.url);
        match reqwest::Proxy::all(&url) {
            Ok(proxy) => {
                tracing::info!("[Upstream] Outbound proxy enabled: {}", url);
                Some(proxy)
            }
            Err(e) => {
                tracing::warn!("[Upstream] Ignoring invalid proxy {}: {}", url, e);
                None
            }
        }
    }

    /// `{base}/models/{model}:generateContent`
    fn build_url(base_url: &str, model: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!(
            "{}/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            model
        ))
    }

    /// Upstream endpoint without credentials, safe to log.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Forward `body` unchanged. Transient transport failures are retried up
    /// to `max_retries` times; HTTP error statuses are returned, never retried.
    pub async fn generate(
        &self,
        credential: &UpstreamCredential,
        body: &Value,
    ) -> Result<UpstreamReply, UpstreamError> {
        let mut attempt: u32 = 0;
        loop {
            match self.send_once(credential, body).await {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = backoff_delay(attempt, self.retry_base_ms, self.retry_max_ms);
                    tracing::warn!(
                        "[Upstream] Attempt {}/{} failed: {}, retrying in {}ms",
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn send_once(
        &self,
        credential: &UpstreamCredential,
        body: &Value,
    ) -> Result<UpstreamReply, UpstreamError> {
        let request = self
            .client
            .post(self.endpoint.clone())
            .header(header::CONTENT_TYPE, "application/json");

        let request = match self.credential_mode {
            CredentialMode::Header => request.header(API_KEY_HEADER, credential.expose()),
            CredentialMode::Query => request.query(&[(API_KEY_QUERY_PARAM, credential.expose())]),
        };

        // without_url: in query mode the URL carries the key
        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| UpstreamError::Request(e.without_url()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = self.read_body_capped(response).await?;

        Ok(UpstreamReply {
            status,
            content_type,
            body,
        })
    }

    /// Buffer the body chunk by chunk, giving up past `max_response_bytes`.
    async fn read_body_capped(
        &self,
        mut response: reqwest::Response,
    ) -> Result<String, UpstreamError> {
        let limit = self.max_response_bytes;
        if response
            .content_length()
            .is_some_and(|len| len > limit as u64)
        {
            return Err(UpstreamError::BodyTooLarge { limit });
        }

        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| UpstreamError::Body(e.without_url()))?
        {
            if buf.len() + chunk.len() > limit {
                return Err(UpstreamError::BodyTooLarge { limit });
            }
            buf.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
