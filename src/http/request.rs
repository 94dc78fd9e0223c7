//! Client request framing
//!
//! Splits a raw request buffer into request line and header lines and
//! normalizes the request target into `host[/path]` form.

use std::sync::LazyLock;

use regex::Regex;

use super::response::find_header;
use crate::error::{ProxyError, ProxyResult};

/// Header section terminator
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Leading scheme of an absolute-form target, optionally preceded by one slash
static SCHEME_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/?https?://").expect("scheme regex is valid"));

/// Parsed client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Normalized target: scheme stripped, `/..` segments removed
    pub target: String,
    pub version: String,
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// Parse a raw request buffer.
    ///
    /// Only the request line is mandatory; header lines are collected up to the
    /// first blank line (or the end of the buffer).
    pub fn parse(buf: &[u8]) -> ProxyResult<Self> {
        let text = String::from_utf8_lossy(buf);
        let mut lines = text.split("\r\n");

        let request_line = lines.next().unwrap_or_default();
        let mut parts = request_line.split_whitespace();
        let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ProxyError::malformed(format!(
                "expected `METHOD TARGET VERSION`, got {request_line:?}"
            )));
        };

        let headers = parse_header_lines(lines);

        Ok(Self {
            method: method.to_string(),
            target: normalize_target(target),
            version: version.to_string(),
            headers,
        })
    }

    /// Case-insensitive header lookup, first match wins
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Target with a host segment.
    ///
    /// Origin-form targets (`/path`) borrow the host from the `Host` header.
    pub fn routable_target(&self) -> ProxyResult<String> {
        if !self.target.starts_with('/') && !self.target.is_empty() {
            return Ok(self.target.clone());
        }

        match self.header("host").map(str::trim) {
            Some(host) if !host.is_empty() => Ok(format!("{host}{}", self.target)),
            _ => Err(ProxyError::malformed(format!(
                "no host in target {:?} and no Host header",
                self.target
            ))),
        }
    }
}

/// Strip the scheme prefix and every `/..` sequence from a request target.
pub fn normalize_target(target: &str) -> String {
    let mut normalized = SCHEME_PREFIX.replace(target, "").into_owned();
    while normalized.contains("/..") {
        normalized = normalized.replace("/..", "");
    }
    normalized
}

/// Offset just past the header terminator, if the buffer contains one.
pub fn header_section_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
        .map(|pos| pos + HEADER_TERMINATOR.len())
}

/// Collect `name: value` pairs until the first blank line.
pub fn parse_header_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<(String, String)> {
    lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute_target() {
        let req =
            Request::parse(b"GET http://example.com/a.html HTTP/1.1\r\nHost: example.com\r\n\r\n")
                .unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.target, "example.com/a.html");
        assert_eq!(req.version, "HTTP/1.1");
        assert_eq!(req.header("HOST"), Some("example.com"));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            Request::parse(b"GET /only-two\r\n\r\n"),
            Err(ProxyError::MalformedRequest { .. })
        ));
        assert!(matches!(
            Request::parse(b""),
            Err(ProxyError::MalformedRequest { .. })
        ));
    }

    #[test]
    fn test_normalize_scheme_variants() {
        assert_eq!(normalize_target("https://example.com/x"), "example.com/x");
        assert_eq!(normalize_target("/http://example.com"), "example.com");
        assert_eq!(normalize_target("example.com/x"), "example.com/x");
        // Only the leading scheme is stripped
        assert_eq!(
            normalize_target("example.com/http://other"),
            "example.com/http://other"
        );
    }

    #[test]
    fn test_normalize_traversal() {
        let normalized = normalize_target("evil.com/../../etc/passwd");
        assert_eq!(normalized, "evil.com//etc/passwd");
        assert!(!normalize_target("a.com/./..../..").contains("/.."));
    }

    #[test]
    fn test_routable_target_from_host_header() {
        let req = Request::parse(b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
        assert_eq!(req.routable_target().unwrap(), "example.com/index.html");

        let req = Request::parse(b"GET /index.html HTTP/1.1\r\n\r\n").unwrap();
        assert!(req.routable_target().is_err());
    }

    #[test]
    fn test_header_section_end() {
        assert_eq!(header_section_end(b"GET / HTTP/1.1\r\n\r\nbody"), Some(18));
        assert_eq!(header_section_end(b"GET / HTTP/1.1\r\n"), None);
    }
}
