use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::models::{CredentialMode, GatewayConfig, UpstreamCredential};

pub const CONFIG_PATH_ENV: &str = "READYPULSE_CONFIG";
pub const CREDENTIAL_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed_to_read_config_file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed_to_parse_config_file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for {key}: {message}")]
    InvalidEnv { key: &'static str, message: String },
}

/// Load configuration from the process environment (and an optional JSON file).
pub fn load_gateway_config() -> Result<GatewayConfig, ConfigError> {
    load_gateway_config_with(|key| std::env::var(key).ok())
}

/// Defaults, then the file named by `READYPULSE_CONFIG`, then env overrides.
pub fn load_gateway_config_with<F>(lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match non_empty(&lookup, CONFIG_PATH_ENV) {
        Some(path) => read_config_file(Path::new(&path))?,
        None => GatewayConfig::default(),
    };
    apply_env_overrides(&mut config, &lookup)?;
    Ok(config)
}

pub fn read_config_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    // Parse via Value first so unknown top-level keys are tolerated uniformly
    let v: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    serde_json::from_value(v).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    config.credential = lookup(CREDENTIAL_ENV).and_then(UpstreamCredential::new);

    if let Some(host) = non_empty(lookup, "HOST") {
        config.host = host;
    }
    if let Some(port) = parse_var::<u16, _>(lookup, "PORT")? {
        config.port = port;
    }
    if let Some(size) = parse_var::<usize, _>(lookup, "READYPULSE_MAX_BODY_SIZE")? {
        config.max_body_size = size;
    }
    if let Some(dist) = non_empty(lookup, "READYPULSE_DIST_PATH") {
        config.dist_path = dist;
    }
    if let Some(dir) = non_empty(lookup, "READYPULSE_LOG_DIR") {
        config.log_dir = Some(dir);
    }

    let upstream = &mut config.upstream;
    if let Some(base) = non_empty(lookup, "READYPULSE_UPSTREAM_BASE_URL") {
        upstream.base_url = base.trim_end_matches('/').to_string();
    }
    if let Some(model) = non_empty(lookup, "READYPULSE_MODEL") {
        upstream.model = model;
    }
    if let Some(mode) = parse_var::<CredentialMode, _>(lookup, "READYPULSE_CREDENTIAL_MODE")? {
        upstream.credential_mode = mode;
    }
    if let Some(secs) = parse_var::<u64, _>(lookup, "READYPULSE_UPSTREAM_TIMEOUT_SECS")? {
        upstream.timeout_secs = secs;
    }
    if let Some(retries) = parse_var::<u32, _>(lookup, "READYPULSE_UPSTREAM_MAX_RETRIES")? {
        upstream.max_retries = retries;
    }
    if let Some(limit) = parse_var::<usize, _>(lookup, "READYPULSE_UPSTREAM_MAX_RESPONSE_BYTES")? {
        upstream.max_response_bytes = limit;
    }
    if let Some(proxy_url) = non_empty(lookup, "READYPULSE_UPSTREAM_PROXY") {
        upstream.proxy.enabled = true;
        upstream.proxy.url = proxy_url;
    }

    Ok(())
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnv {
                key,
                message: format!("{} ({})", e, raw),
            }),
        None => Ok(None),
    }
}
