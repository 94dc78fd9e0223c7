//! Origin fetch
//!
//! Opens a fresh connection per request, sends a minimal request (request
//! line plus `Host`) and reads the response until it is complete, the origin
//! closes, or the size cap is hit.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};

use crate::config::OriginConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::http::response::Framing;
use crate::http::OriginResponse;
use crate::logger;

const READ_CHUNK: usize = 16 * 1024;

/// Fetches resources from origin servers
#[derive(Debug, Clone)]
pub struct OriginFetcher {
    default_port: u16,
    connect_timeout: Duration,
    read_timeout: Duration,
    max_response_size: usize,
}

impl OriginFetcher {
    pub fn new(config: &OriginConfig) -> Self {
        Self {
            default_port: config.default_port,
            connect_timeout: Duration::from_secs(config.connect_timeout),
            read_timeout: Duration::from_secs(config.read_timeout),
            max_response_size: config.max_response_size,
        }
    }

    /// Request sent to the origin: request line, `Host` header, blank line.
    ///
    /// No client headers are forwarded.
    pub fn build_request(method: &str, resource: &str, version: &str, host: &str) -> String {
        format!("{method} {resource} {version}\r\nHost: {host}\r\n\r\n\r\n")
    }

    /// Split `host[:port]` into the connect host and port.
    pub fn split_authority<'a>(&self, authority: &'a str) -> (&'a str, u16) {
        if let Some((host, port)) = authority.rsplit_once(':') {
            // A bare IPv6 literal has colons but no port
            if !host.contains(':') || host.ends_with(']') {
                if let Ok(port) = port.parse() {
                    return (host, port);
                }
            }
        }
        (authority, self.default_port)
    }

    /// Fetch `resource` from the origin named by `authority`.
    ///
    /// DNS, connect and write failures, and a timeout or EOF before any byte
    /// arrives, all surface as `OriginUnreachable`. A read cut short after
    /// some bytes arrived still yields a response, marked incomplete.
    pub async fn fetch(
        &self,
        authority: &str,
        resource: &str,
        method: &str,
        version: &str,
    ) -> ProxyResult<OriginResponse> {
        let (host, port) = self.split_authority(authority);
        let addr = format!("{host}:{port}");
        logger::log_debug(&format!("[Origin] Connecting to {addr}"));

        let mut stream = timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                let reason = format!("connect timed out after {:?}", self.connect_timeout);
                ProxyError::unreachable(authority, reason)
            })?
            .map_err(|e| ProxyError::unreachable(authority, e))?;

        let request = Self::build_request(method, resource, version, authority);
        logger::log_debug(&format!(
            "[Origin] Forwarding {method} {resource} {version} to {authority}"
        ));

        let deadline = Instant::now() + self.read_timeout;
        timeout_at(deadline, stream.write_all(request.as_bytes()))
            .await
            .map_err(|_| ProxyError::unreachable(authority, "write timed out"))?
            .map_err(|e| ProxyError::unreachable(authority, e))?;

        let read = read_response(&mut stream, method, self.max_response_size, deadline)
            .await
            .map_err(|e| ProxyError::unreachable(authority, e))?;

        if read.raw.is_empty() {
            return Err(ProxyError::unreachable(authority, "empty response"));
        }
        if !read.complete {
            logger::log_warning(&format!(
                "[Origin] Incomplete response from {authority} ({} bytes); relaying without caching",
                read.raw.len()
            ));
        }
        Ok(OriginResponse::parse(read.raw).with_complete(read.complete))
    }
}

/// Bytes read from the origin and whether they form the whole response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRead {
    pub raw: Vec<u8>,
    pub complete: bool,
}

/// Read the reply to `method` until its framing says it is complete, EOF,
/// `limit` bytes, or `deadline`.
///
/// Hitting the deadline before any byte arrived is a `TimedOut` error;
/// afterwards it ends the read with whatever was received.
pub async fn read_response<R>(
    reader: &mut R,
    method: &str,
    limit: usize,
    deadline: Instant,
) -> std::io::Result<ResponseRead>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    let mut framing: Option<Framing> = None;

    let complete = loop {
        let Ok(read) = timeout_at(deadline, reader.read(&mut chunk)).await else {
            if buf.is_empty() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "read timed out",
                ));
            }
            break false;
        };
        let n = read?;
        if n == 0 {
            break framing.is_some_and(|f| f.is_complete_at_eof(&buf));
        }
        buf.extend_from_slice(&chunk[..n]);

        if framing.is_none() {
            framing = Framing::detect(method, &buf);
        }
        if buf.len() >= limit {
            let complete = buf.len() == limit && framing.is_some_and(|f| f.is_complete(&buf));
            if !complete {
                logger::log_warning(&format!("Origin response truncated at {limit} bytes"));
                buf.truncate(limit);
            }
            break complete;
        }
        if framing.is_some_and(|f| f.is_complete(&buf)) {
            break true;
        }
    };

    Ok(ResponseRead {
        raw: buf,
        complete,
    })
}
