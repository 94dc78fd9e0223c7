// Configuration module entry point
// Loads proxy configuration and holds the shared runtime state

mod state;
mod types;

use std::net::{SocketAddr, ToSocketAddrs};

// Re-export public types
pub use state::AppState;
pub use types::{
    CacheConfig, Config, LoggingConfig, OriginConfig, PerformanceConfig, ServerConfig,
};

/// Default config file name (extension inferred by the `config` crate)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Missing files fall back to defaults; `PROXY_<SECTION>__<KEY>` env vars override both
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("PROXY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("cache.dir", "./cache")?
            .set_default("cache.enabled", true)?
            .set_default("cache.default_filename", "default")?
            .set_default("origin.default_port", 80)?
            .set_default("origin.connect_timeout", 10)?
            .set_default("origin.read_timeout", 30)?
            .set_default("origin.max_response_size", 10_485_760)? // 10MB
            .set_default("performance.client_timeout", 30)?
            .set_default("performance.max_request_size", 1_048_576)? // 1MB
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .build()?;

        settings.try_deserialize()
    }

    /// Apply command-line overrides for the listening address
    pub fn with_listen_overrides(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        self
    }

    /// Resolve the listening address; hostnames such as `localhost` are looked up
    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        let host = self.server.host.as_str();
        (host, self.server.port)
            .to_socket_addrs()
            .map_err(|e| format!("Invalid address {host}:{}: {e}", self.server.port))?
            .next()
            .ok_or_else(|| format!("No address found for {host}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("does/not/exist/proxy").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.cache.dir, "./cache");
        assert!(cfg.cache.enabled);
        assert_eq!(cfg.cache.default_filename, "default");
        assert_eq!(cfg.origin.default_port, 80);
        assert_eq!(cfg.performance.max_connections, None);
        assert_eq!(cfg.logging.access_log_format, "combined");
    }

    #[test]
    fn test_listen_overrides() {
        let cfg = Config::load_from("does/not/exist/proxy")
            .unwrap()
            .with_listen_overrides(Some("0.0.0.0".to_string()), Some(3128));
        assert_eq!(
            cfg.get_socket_addr().unwrap(),
            "0.0.0.0:3128".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_invalid_address() {
        let cfg = Config::load_from("does/not/exist/proxy")
            .unwrap()
            .with_listen_overrides(Some("not a host".to_string()), None);
        assert!(cfg.get_socket_addr().is_err());
    }
}
