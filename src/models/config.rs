use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// UpstreamCredential
// ============================================================================

/// Server-held API key for the generative-language API.
///
/// Loaded once at startup and read-only afterwards. `Debug` is redacted and the
/// value is never serialized, so it cannot leak through logs or config dumps.
#[derive(Clone, PartialEq, Eq)]
pub struct UpstreamCredential(String);

impl UpstreamCredential {
    /// Returns `None` for empty or whitespace-only keys.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UpstreamCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UpstreamCredential(***)")
    }
}

// ============================================================================
// CredentialMode
// ============================================================================

/// How the credential travels to upstream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CredentialMode {
    /// `x-goog-api-key` request header
    Header,
    /// `?key=` query parameter
    Query,
}

impl Default for CredentialMode {
    fn default() -> Self {
        Self::Header
    }
}

impl std::str::FromStr for CredentialMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "header" => Ok(Self::Header),
            "query" => Ok(Self::Query),
            other => Err(format!("unknown credential mode: {}", other)),
        }
    }
}

// ============================================================================
// Upstream
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamProxyConfig {
    pub enabled: bool,
    pub url: String,
}

impl Default for UpstreamProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// API root, e.g. `https://generativelanguage.googleapis.com/v1beta`
    pub base_url: String,
    pub model: String,
    pub credential_mode: CredentialMode,
    /// Whole-request timeout (seconds)
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Extra attempts on connect/timeout failures. 0 means a single attempt.
    pub max_retries: u32,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
    /// Upstream bodies past this size are dropped and reported as a local error
    pub max_response_bytes: usize,
    pub proxy: UpstreamProxyConfig,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_base_url(),
            model: default_model(),
            credential_mode: CredentialMode::default(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_retries: 0,
            retry_base_ms: 500,
            retry_max_ms: 8_000,
            max_response_bytes: 10 * 1024 * 1024,
            proxy: UpstreamProxyConfig::default(),
        }
    }
}

fn default_upstream_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

// ============================================================================
// GatewayConfig (top-level)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub max_body_size: usize,
    pub dist_path: String,
    pub log_dir: Option<String>,
    pub upstream: UpstreamConfig,
    /// Only ever populated from the environment.
    #[serde(skip)]
    pub credential: Option<UpstreamCredential>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            max_body_size: 10 * 1024 * 1024,
            dist_path: "dist".to_string(),
            log_dir: None,
            upstream: UpstreamConfig::default(),
            credential: None,
        }
    }
}

impl GatewayConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_rejects_blank() {
        assert!(UpstreamCredential::new("").is_none());
        assert!(UpstreamCredential::new("   ").is_none());
        assert_eq!(UpstreamCredential::new(" abc ").unwrap().expose(), "abc");
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let cred = UpstreamCredential::new("super-secret").unwrap();
        let rendered = format!("{:?}", cred);
        assert!(!rendered.contains("super-secret"));

        let config = GatewayConfig {
            credential: Some(cred),
            ..GatewayConfig::default()
        };
        assert!(!format!("{:?}", config).contains("super-secret"));
    }

    #[test]
    fn test_credential_never_serialized() {
        let config = GatewayConfig {
            credential: UpstreamCredential::new("super-secret"),
            ..GatewayConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("super-secret"));
        assert!(!json.contains("\"credential\""));
    }

    #[test]
    fn test_credential_mode_parse() {
        assert_eq!("header".parse::<CredentialMode>().unwrap(), CredentialMode::Header);
        assert_eq!(" QUERY ".parse::<CredentialMode>().unwrap(), CredentialMode::Query);
        assert!("cookie".parse::<CredentialMode>().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"port": 8080, "upstream": {"model": "gemini-2.0-flash"}}"#)
                .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.upstream.model, "gemini-2.0-flash");
        assert_eq!(config.upstream.timeout_secs, 30);
        assert_eq!(config.upstream.credential_mode, CredentialMode::Header);
        assert!(config.credential.is_none());
    }
}
