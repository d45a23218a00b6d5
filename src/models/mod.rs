pub mod config;

pub use config::{
    CredentialMode, GatewayConfig, UpstreamConfig, UpstreamCredential, UpstreamProxyConfig,
};
