// Gateway proxy module

pub mod common;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod upstream;

pub use error::{GatewayError, UpstreamError};
pub use server::{GatewayServer, ServerError};
