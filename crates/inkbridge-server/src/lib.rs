//! WebSocket transport for the inkbridge relay.

pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod health;
pub mod server;

pub use config::{AppConfig, ConfigError, ServerConfig};
pub use connection::ConnectionTable;
pub use server::{build_router, start, AppState, ServerHandle};
