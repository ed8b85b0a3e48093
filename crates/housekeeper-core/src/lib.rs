//! # housekeeper-core
//!
//! Shared plumbing for the Housekeeper MCP gateway: the YAML configuration
//! model with its file-discovery rules, and process-wide logging setup.
//!
//! Configuration is loaded once at startup and treated as immutable for the
//! lifetime of the process. Command-line flags are merged over the file by
//! the binary crate; nothing in this crate reads the environment except the
//! `HOUSEKEEPER_CONFIG` override.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, ClickhouseConfig, ConfigError, GoogleConfig, LogConfig, OauthConfig,
    PrometheusConfig, SseConfig, TlsConfig, TsnetConfig,
};
pub use logging::init_logging;
