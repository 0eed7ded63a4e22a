//! Domain layer: pure configuration types with no I/O dependencies
//! beyond loading the config file itself.

pub mod config;

pub use config::{ConfigError, ServerConfig};
