//! Per-connection request dispatch
//!
//! One request per connection:
//!
//! ```text
//! AwaitRequest -> Parsed -> CacheHit ----------------------------> Relay -> Closed
//!                        \-> CacheMiss -> FetchOrigin -> Store/Skip -> Relay -> Closed
//! ```
//!
//! Malformed requests and unreachable origins go straight to `Closed` without
//! relaying anything. The client connection is shut down on every path.

use std::net::SocketAddr;
use std::time::Instant;

use chrono::Utc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::fetcher::OriginFetcher;
use crate::cache::{CacheKey, CacheLookup, DiskStore};
use crate::config::Config;
use crate::error::ProxyResult;
use crate::http::request::header_section_end;
use crate::http::{is_cacheable, OriginResponse, Request};
use crate::logger::{self, AccessLogEntry};

const READ_CHUNK: usize = 8 * 1024;

/// How a request was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from a fresh stored entry
    Hit,
    /// No entry; fetched from the origin
    Miss,
    /// Entry expired; fetched from the origin
    Stale,
    /// Caching disabled; fetched from the origin
    Bypass,
    /// Origin unreachable; nothing relayed
    Error,
    /// Request could not be parsed; nothing relayed
    Malformed,
}

impl CacheStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Stale => "STALE",
            Self::Bypass => "BYPASS",
            Self::Error => "ERROR",
            Self::Malformed => "MALFORMED",
        }
    }
}

/// Orchestrates parsing, cache lookup, origin fetch and storage
pub struct Dispatcher {
    store: DiskStore,
    fetcher: OriginFetcher,
    cache_enabled: bool,
    placeholder: String,
    max_request_size: usize,
    access_log: bool,
    access_log_format: String,
}

impl Dispatcher {
    pub fn new(config: &Config) -> Self {
        Self {
            store: DiskStore::new(&config.cache.dir),
            fetcher: OriginFetcher::new(&config.origin),
            cache_enabled: config.cache.enabled,
            placeholder: config.cache.default_filename.clone(),
            max_request_size: config.performance.max_request_size,
            access_log: config.logging.access_log,
            access_log_format: config.logging.access_log_format.clone(),
        }
    }

    pub const fn store(&self) -> &DiskStore {
        &self.store
    }

    /// Handle one client connection to completion and close it.
    pub async fn dispatch<C>(&self, mut conn: C, peer_addr: SocketAddr) -> CacheStatus
    where
        C: AsyncRead + AsyncWrite + Unpin,
    {
        let started = Instant::now();
        let (status, entry) = self.serve(&mut conn, peer_addr).await;

        // Closed: half-close then drop, whatever path was taken
        if let Err(e) = conn.shutdown().await {
            logger::log_debug(&format!("Shutdown of {peer_addr} failed: {e}"));
        }
        drop(conn);

        if let Some(mut entry) = entry {
            entry.cache_status = status.as_str();
            entry.request_time_us =
                u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
            if self.access_log {
                logger::log_access(&entry, &self.access_log_format);
            }
        }
        status
    }

    async fn serve<C>(
        &self,
        conn: &mut C,
        peer_addr: SocketAddr,
    ) -> (CacheStatus, Option<AccessLogEntry>)
    where
        C: AsyncRead + AsyncWrite + Unpin,
    {
        // AwaitRequest -> Parsed
        let raw = match read_request(conn, self.max_request_size).await {
            Ok(raw) => raw,
            Err(e) => {
                logger::log_warning(&format!("Failed to read request from {peer_addr}: {e}"));
                return (CacheStatus::Malformed, None);
            }
        };
        let (request, target) = match parse_request(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                logger::log_malformed_request(&peer_addr, &e);
                return (CacheStatus::Malformed, None);
            }
        };

        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            request.method.clone(),
            target.clone(),
            request.version.clone(),
        );

        let key = CacheKey::resolve(&target, &self.placeholder);
        logger::log_debug(&format!(
            "[Cache] {} {} -> {}",
            request.method,
            target,
            self.store.path_for(&key).display()
        ));

        // Parsed -> CacheHit | CacheMiss
        let miss_status = if self.cache_enabled {
            match self.lookup(&key).await {
                CacheLookup::Fresh(bytes) => {
                    let cached = OriginResponse::parse(bytes);
                    relay(conn, &cached.raw, &peer_addr).await;
                    entry.status = cached.status_code();
                    entry.bytes_sent = cached.raw.len();
                    return (CacheStatus::Hit, Some(entry));
                }
                CacheLookup::Stale(_) => CacheStatus::Stale,
                CacheLookup::Absent => CacheStatus::Miss,
            }
        } else {
            CacheStatus::Bypass
        };

        // FetchOrigin
        let response = match self
            .fetcher
            .fetch(key.host(), key.resource(), &request.method, &request.version)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                logger::log_origin_failure(&e);
                return (CacheStatus::Error, Some(entry));
            }
        };

        // Store | Skip
        if self.cache_enabled && response.complete && is_cacheable(&response) {
            match self.store.put(&key, &response.raw).await {
                Ok(()) => logger::log_cache_stored(key.as_str(), response.raw.len()),
                Err(e) => logger::log_cache_write_failure(&e),
            }
        } else if !response.complete {
            logger::log_debug(&format!("[Cache] Not storing {key}: response incomplete"));
        } else {
            logger::log_debug(&format!("[Cache] Not storing {key}: {}", response.status_line));
        }

        // RelayToClient
        relay(conn, &response.raw, &peer_addr).await;
        entry.status = response.status_code();
        entry.bytes_sent = response.raw.len();
        (miss_status, Some(entry))
    }

    /// Cache lookup where read failures count as a miss
    async fn lookup(&self, key: &CacheKey) -> CacheLookup {
        match self.store.lookup(key, Utc::now()).await {
            Ok(lookup) => lookup,
            Err(e) => {
                logger::log_cache_read_failure(&e);
                CacheLookup::Absent
            }
        }
    }
}

/// Parse a request and derive its `host[/path]` target
fn parse_request(raw: &[u8]) -> ProxyResult<(Request, String)> {
    let request = Request::parse(raw)?;
    let target = request.routable_target()?;
    Ok((request, target))
}

/// Read a client request up to the end of its header section, EOF, or `limit` bytes.
pub async fn read_request<R>(reader: &mut R, limit: usize) -> ProxyResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() >= limit || header_section_end(&buf).is_some() {
            break;
        }
    }

    Ok(buf)
}

/// Write the whole response to the client; a vanished client is only logged.
async fn relay<W>(conn: &mut W, bytes: &[u8], peer_addr: &SocketAddr)
where
    W: AsyncWrite + Unpin,
{
    if let Err(e) = conn.write_all(bytes).await {
        logger::log_warning(&format!("Failed to relay response to {peer_addr}: {e}"));
        return;
    }
    if let Err(e) = conn.flush().await {
        logger::log_warning(&format!("Failed to flush response to {peer_addr}: {e}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProxyError;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// Client whose reads always fail
    struct ResetClient;

    impl AsyncRead for ResetClient {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::ErrorKind::ConnectionReset.into()))
        }
    }

    #[tokio::test]
    async fn test_read_request_stops_at_headers() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        client
            .write_all(b"GET http://a.com/ HTTP/1.1\r\nHost: a.com\r\n\r\n")
            .await
            .unwrap();

        // Client stays open; the header terminator ends the read
        let raw = read_request(&mut server, 4096).await.unwrap();
        assert!(raw.ends_with(b"\r\n\r\n"));
        drop(client);
    }

    #[tokio::test]
    async fn test_read_request_until_eof() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
        drop(client);

        let raw = read_request(&mut server, 4096).await.unwrap();
        assert_eq!(raw, b"GET / HTTP/1.1\r\n");
    }

    #[tokio::test]
    async fn test_read_request_error_is_io() {
        let err = read_request(&mut ResetClient, 4096).await.unwrap_err();
        assert!(matches!(err, ProxyError::Io(ref e) if e.kind() == std::io::ErrorKind::ConnectionReset));
    }

    #[test]
    fn test_cache_status_labels() {
        assert_eq!(CacheStatus::Hit.as_str(), "HIT");
        assert_eq!(CacheStatus::Stale.as_str(), "STALE");
        assert_eq!(CacheStatus::Malformed.as_str(), "MALFORMED");
    }
}
