pub mod config;
pub mod logger;

pub use config::{load_gateway_config, ConfigError};
pub use logger::init_logger;
