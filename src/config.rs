//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::query::DEFAULT_TIME_COLUMN;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub compiler: CompilerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,

    /// SQL script run once at startup (schema, seed data)
    #[serde(default)]
    pub init_script: Option<String>,
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("analytica").join("analytics.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./analytica_data/analytics.db".to_string())
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            init_script: None,
        }
    }
}

impl DatabaseConfig {
    /// Database path with a leading `~/` expanded to the home directory
    pub fn resolved_path(&self) -> PathBuf {
        expand_home(&self.path)
    }

    /// Init script path, `~/` expanded
    pub fn resolved_init_script(&self) -> Option<PathBuf> {
        self.init_script.as_deref().map(expand_home)
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_body_size() -> usize {
    2 * 1024 * 1024 // 2 MB
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_body_size: default_max_body_size(),
        }
    }
}

/// Query compiler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CompilerConfig {
    /// Column a time range filters on when no time dimension is requested
    #[serde(default = "default_time_column")]
    pub default_time_column: String,
}

fn default_time_column() -> String {
    DEFAULT_TIME_COLUMN.to_string()
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_time_column: default_time_column(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("analytica").join("config.toml")),
            Some(PathBuf::from("/etc/analytica/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Database overrides
        if let Some(path) = var("ANALYTICA_DATABASE_PATH") {
            self.database.path = path;
        }

        // API overrides
        if let Some(host) = var("ANALYTICA_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("ANALYTICA_API_PORT") {
            match port.parse() {
                Ok(p) => self.api.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid ANALYTICA_API_PORT"),
            }
        }

        // Compiler overrides
        if let Some(column) = var("ANALYTICA_DEFAULT_TIME_COLUMN") {
            self.compiler.default_time_column = column;
        }

        // Logging overrides
        if let Some(level) = var("ANALYTICA_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("ANALYTICA_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Analytica Configuration
#
# Environment variables override these settings:
# - ANALYTICA_DATABASE_PATH
# - ANALYTICA_API_HOST
# - ANALYTICA_API_PORT
# - ANALYTICA_DEFAULT_TIME_COLUMN
# - ANALYTICA_LOG_LEVEL
# - ANALYTICA_LOG_FORMAT

[database]
# SQLite database file
path = "~/.local/share/analytica/analytics.db"

# SQL script run at startup (schema, seed data)
# init_script = "/etc/analytica/init.sql"

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8080

# Request timeout in seconds
request_timeout_secs = 30

# Maximum request body size in bytes
max_body_size = 2097152

[compiler]
# Column a time range filters on when the request has no time dimension
default_time_column = "creation_date"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
