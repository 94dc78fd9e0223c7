//! Error types for the proxy core.

use std::io;

/// Errors raised while handling a single proxied request.
///
/// Every variant is local to the connection that produced it; the dispatcher
/// turns them into log lines and a closed connection.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Request line could not be parsed or no origin host could be derived.
    #[error("malformed request: {reason}")]
    MalformedRequest { reason: String },

    /// DNS resolution, connect or origin read failed (including timeouts).
    #[error("origin {host} unreachable: {reason}")]
    OriginUnreachable { host: String, reason: String },

    /// Filesystem error while storing a response.
    #[error("cache write failed for {key}: {source}")]
    CacheWrite {
        key: String,
        #[source]
        source: io::Error,
    },

    /// Filesystem error while reading a stored response (other than not-found).
    #[error("cache read failed for {key}: {source}")]
    CacheRead {
        key: String,
        #[source]
        source: io::Error,
    },

    /// Client transport error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl ProxyError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRequest {
            reason: reason.into(),
        }
    }

    pub fn unreachable(host: &str, reason: impl std::fmt::Display) -> Self {
        Self::OriginUnreachable {
            host: host.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;
