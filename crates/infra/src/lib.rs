//! Infrastructure layer: store adapters, schema bootstrap, configuration.

pub mod config;
pub mod store;


pub use config::{AppConfig, ConfigError, DatabaseConfig, ServerConfig};
