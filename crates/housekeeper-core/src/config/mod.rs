//! Configuration types for the Housekeeper MCP gateway.
//!
//! Configuration is loaded from a single YAML file. The file is found either
//! via an explicit `--config` path, the `HOUSEKEEPER_CONFIG` environment
//! variable, or a search over the conventional locations (current directory,
//! `./configs`, the executable's directory and its `configs`,
//! `$HOME/.config/housekeeper`, `/etc/housekeeper`).

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Complete Housekeeper configuration loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// ClickHouse connection and query policy settings.
    #[serde(default)]
    pub clickhouse: ClickhouseConfig,

    /// Prometheus / VictoriaMetrics settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// HTTP + SSE transport settings.
    #[serde(default)]
    pub sse: SseConfig,

    /// Embedded OAuth authorization server settings.
    #[serde(default)]
    pub oauth: OauthConfig,

    /// Overlay-network (tsnet) transport settings.
    #[serde(default)]
    pub tsnet: TsnetConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// ClickHouse connection settings and the allowed-database policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickhouseConfig {
    #[serde(default = "default_ch_host")]
    pub host: String,

    #[serde(default = "default_ch_port")]
    pub port: u16,

    #[serde(default = "default_ch_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Default database for the connection; also the database whose tables
    /// are wrapped in `clusterAllReplicas` fan-out.
    #[serde(default = "default_ch_database")]
    pub database: String,

    /// Cluster name passed to `clusterAllReplicas`.
    #[serde(default = "default_ch_cluster")]
    pub cluster: String,

    /// Databases the validator permits queries to reference.
    /// Matched case-insensitively on the `db.table` prefix.
    #[serde(default = "default_allowed_databases")]
    pub allowed_databases: Vec<String>,

    /// Whether to connect over TLS.
    #[serde(default)]
    pub tls: bool,
}

impl Default for ClickhouseConfig {
    fn default() -> Self {
        Self {
            host: default_ch_host(),
            port: default_ch_port(),
            user: default_ch_user(),
            password: String::new(),
            database: default_ch_database(),
            cluster: default_ch_cluster(),
            allowed_databases: default_allowed_databases(),
            tls: false,
        }
    }
}

/// Prometheus / VictoriaMetrics client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    #[serde(default = "default_prom_host")]
    pub host: String,

    #[serde(default = "default_prom_port")]
    pub port: u16,

    /// When true, the base URL gains the VictoriaMetrics cluster-mode
    /// `select/<tenant>/<prefix>` path segments.
    #[serde(default)]
    pub vm_cluster_mode: bool,

    #[serde(default)]
    pub vm_tenant_id: String,

    /// Path prefix under the tenant segment; defaults to `prometheus`.
    #[serde(default)]
    pub vm_path_prefix: String,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            host: default_prom_host(),
            port: default_prom_port(),
            vm_cluster_mode: false,
            vm_tenant_id: String::new(),
            vm_path_prefix: String::new(),
        }
    }
}

/// HTTP + SSE transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SseConfig {
    #[serde(default = "default_sse_port")]
    pub port: u16,

    #[serde(default)]
    pub tls: TlsConfig,
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            port: default_sse_port(),
            tls: TlsConfig::default(),
        }
    }
}

/// TLS listener settings for the SSE transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_tls_port")]
    pub port: u16,

    #[serde(default)]
    pub cert_file: String,

    #[serde(default)]
    pub key_file: String,

    /// Generate an in-memory self-signed certificate when no cert/key files
    /// are configured. Never used as a fallback for files that fail to load.
    #[serde(default)]
    pub self_signed: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_tls_port(),
            cert_file: String::new(),
            key_file: String::new(),
            self_signed: false,
        }
    }
}

/// Embedded OAuth authorization server settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OauthConfig {
    /// Whether the authority endpoints are mounted at all.
    #[serde(default)]
    pub enabled: bool,

    /// Whether bearer tokens are required on the MCP transport endpoints.
    #[serde(default)]
    pub required: bool,

    /// Issuer override. When empty the issuer is derived from each request.
    #[serde(default)]
    pub issuer: String,

    #[serde(default)]
    pub google: GoogleConfig,
}

/// Google federated-login settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GoogleConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    /// Email domains admitted after federated login. Empty means any.
    #[serde(default)]
    pub allowed_domains: Vec<String>,

    /// Base URL for the federation callback. When empty the URL is derived
    /// from the incoming request.
    #[serde(default)]
    pub redirect_base_url: String,
}

/// Overlay-network (tsnet) transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsnetConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_tsnet_hostname")]
    pub hostname: String,

    #[serde(default)]
    pub auth_key: String,

    #[serde(default)]
    pub ephemeral: bool,

    /// Directory for the overlay host's persisted state.
    #[serde(default = "default_tsnet_state_dir")]
    pub state_dir: String,

    #[serde(default = "default_tsnet_https_port")]
    pub https_port: u16,
}

impl Default for TsnetConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            hostname: default_tsnet_hostname(),
            auth_key: String::new(),
            ephemeral: false,
            state_dir: default_tsnet_state_dir(),
            https_port: default_tsnet_https_port(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: `text` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions

fn default_ch_host() -> String {
    "localhost".to_string()
}

fn default_ch_port() -> u16 {
    9440
}

fn default_ch_user() -> String {
    "default".to_string()
}

fn default_ch_database() -> String {
    "system".to_string()
}

fn default_ch_cluster() -> String {
    "default".to_string()
}

fn default_allowed_databases() -> Vec<String> {
    vec!["system".to_string()]
}

fn default_prom_host() -> String {
    "localhost".to_string()
}

fn default_prom_port() -> u16 {
    9090
}

fn default_sse_port() -> u16 {
    3333
}

fn default_tls_port() -> u16 {
    3443
}

fn default_tsnet_hostname() -> String {
    "housekeeper".to_string()
}

fn default_tsnet_state_dir() -> String {
    "./tsnet-state".to_string()
}

fn default_tsnet_https_port() -> u16 {
    443
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Resolve the configuration file and load it.
    ///
    /// Resolution order: the explicit path argument, then the
    /// `HOUSEKEEPER_CONFIG` environment variable, then a search over the
    /// conventional locations. A missing file in the search is not an error;
    /// defaults apply. An explicit path that does not exist is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Self::from_file(path);
        }

        if let Ok(path) = env::var("HOUSEKEEPER_CONFIG") {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(ConfigError::Config(format!(
                    "HOUSEKEEPER_CONFIG points at a missing file: {}",
                    path.display()
                )));
            }
            return Self::from_file(&path);
        }

        match find_config_file() {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config file");
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }
}

/// Search the conventional locations for `config.yml` / `config.yaml`.
fn find_config_file() -> Option<PathBuf> {
    let mut dirs: Vec<PathBuf> = vec![PathBuf::from("."), PathBuf::from("./configs")];

    if let Ok(exe) = env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            dirs.push(exe_dir.to_path_buf());
            dirs.push(exe_dir.join("configs"));
        }
    }

    if let Ok(home) = env::var("HOME") {
        dirs.push(PathBuf::from(home).join(".config").join("housekeeper"));
    }
    dirs.push(PathBuf::from("/etc/housekeeper"));

    for dir in dirs {
        for name in ["config.yml", "config.yaml"] {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}
