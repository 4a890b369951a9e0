//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Telephony provider settings.
    #[serde(default)]
    pub telephony: TelephonyConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Busy timeout for SQLite connections, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "housecall_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Telephony provider configuration for placing outbound calls.
#[derive(Debug, Clone, Deserialize)]
pub struct TelephonyConfig {
    /// Base URL of the provider's call API.
    #[serde(default)]
    pub api_base_url: String,

    /// Bearer token for the provider API.
    #[serde(default)]
    pub api_token: String,

    /// Caller ID the provider dials out from.
    #[serde(default)]
    pub from_number: String,

    /// Seconds between persistence-reconciliation passes.
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    5050
}

fn default_db_path() -> String {
    "housecall.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_reconcile_interval_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            api_token: String::new(),
            from_number: String::new(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `HOUSECALL_HOST` overrides `server.host`
/// - `HOUSECALL_PORT` overrides `server.port`
/// - `HOUSECALL_DB_PATH` overrides `database.path`
/// - `HOUSECALL_LOG_LEVEL` overrides `logging.level`
/// - `HOUSECALL_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `HOUSECALL_TELEPHONY_URL` overrides `telephony.api_base_url`
/// - `HOUSECALL_TELEPHONY_TOKEN` overrides `telephony.api_token`
/// - `HOUSECALL_FROM_NUMBER` overrides `telephony.from_number`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("HOUSECALL_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("HOUSECALL_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("HOUSECALL_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(level) = std::env::var("HOUSECALL_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("HOUSECALL_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(url) = std::env::var("HOUSECALL_TELEPHONY_URL") {
        config.telephony.api_base_url = url;
    }
    if let Ok(token) = std::env::var("HOUSECALL_TELEPHONY_TOKEN") {
        config.telephony.api_token = token;
    }
    if let Ok(from) = std::env::var("HOUSECALL_FROM_NUMBER") {
        config.telephony.from_number = from;
    }

    Ok(config)
}
