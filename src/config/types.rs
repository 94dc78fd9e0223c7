// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub origin: OriginConfig,
    pub performance: PerformanceConfig,
    pub logging: LoggingConfig,
}

/// Listening socket configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Disk cache configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Cache root directory
    pub dir: String,
    /// When false every request goes to the origin and nothing is stored
    pub enabled: bool,
    /// File name used for targets ending in `/`
    pub default_filename: String,
}

/// Origin connection configuration
#[derive(Debug, Deserialize, Clone)]
pub struct OriginConfig {
    /// Port used when the target has no explicit port
    pub default_port: u16,
    /// DNS resolution + connect timeout (seconds)
    pub connect_timeout: u64,
    /// Timeout for sending the request and reading the whole response (seconds)
    pub read_timeout: u64,
    /// Maximum response bytes read from the origin
    pub max_response_size: usize,
}

/// Client connection limits
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    /// Bound on handling one client connection (seconds)
    pub client_timeout: u64,
    /// Maximum request bytes buffered from the client
    pub max_request_size: usize,
    pub max_connections: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

impl LoggingConfig {
    /// Whether per-request diagnostic lines should be written
    pub fn is_verbose(&self) -> bool {
        matches!(self.level.to_ascii_lowercase().as_str(), "debug" | "trace")
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}
