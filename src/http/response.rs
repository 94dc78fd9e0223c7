//! Origin response framing
//!
//! Responses are relayed and stored verbatim; this module only reads the
//! status line and header lines that the caching policy needs, and decides
//! when a response read from the origin is complete.

use super::request::{header_section_end, parse_header_lines};

/// Terminating chunk of a chunked body
const CHUNKED_TERMINATOR: &[u8] = b"0\r\n\r\n";

/// Response received from the origin server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginResponse {
    pub status_line: String,
    pub headers: Vec<(String, String)>,
    pub raw: Vec<u8>,
    /// False when the read stopped early (size cap, timeout, origin closed
    /// mid-body). Incomplete responses are relayed but never stored.
    pub complete: bool,
}

impl OriginResponse {
    /// Frame raw response bytes. Never fails: an empty or garbled response
    /// simply has an empty status line and no headers.
    pub fn parse(raw: Vec<u8>) -> Self {
        let (status_line, headers) = parse_head(&raw);
        Self {
            status_line,
            headers,
            raw,
            complete: true,
        }
    }

    #[must_use]
    pub fn with_complete(mut self, complete: bool) -> Self {
        self.complete = complete;
        self
    }

    /// Numeric status code from the status line
    pub fn status_code(&self) -> Option<u16> {
        status_code(&self.status_line)
    }

    /// Case-insensitive header lookup, first match wins
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Status line and header lines of a raw HTTP message.
///
/// Only the header section is decoded, so large bodies are not copied.
pub fn parse_head(raw: &[u8]) -> (String, Vec<(String, String)>) {
    let head_len = header_section_end(raw).unwrap_or(raw.len());
    let text = String::from_utf8_lossy(&raw[..head_len]);
    let mut lines = text.split("\r\n");
    let status_line = lines.next().unwrap_or_default().trim().to_string();
    (status_line, parse_header_lines(lines))
}

/// Extract the status code from `HTTP/x.y NNN reason`
pub fn status_code(status_line: &str) -> Option<u16> {
    status_line.split_whitespace().nth(1)?.parse().ok()
}

pub fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// How the end of a response body is recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// No body follows the header section (HEAD, 1xx, 204, 304)
    NoBody,
    /// `Content-Length` declared; value is the total message length
    Length(usize),
    /// `Transfer-Encoding: chunked`; ends with the zero-size chunk
    Chunked,
    /// No framing hint; the response ends when the origin closes
    UntilEof,
}

impl Framing {
    /// Determine framing of the reply to `method` once the header section is in `buf`.
    pub fn detect(method: &str, buf: &[u8]) -> Option<Self> {
        let body_start = header_section_end(buf)?;
        if method.eq_ignore_ascii_case("HEAD") {
            return Some(Self::NoBody);
        }
        let (status_line, headers) = parse_head(buf);

        if let Some(code) = status_code(&status_line) {
            if (100..200).contains(&code) || code == 204 || code == 304 {
                return Some(Self::NoBody);
            }
        }

        let chunked = find_header(&headers, "transfer-encoding")
            .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"));
        if chunked {
            return Some(Self::Chunked);
        }

        let framing = find_header(&headers, "content-length")
            .and_then(|len| len.trim().parse::<usize>().ok())
            .map_or(Self::UntilEof, |len| Self::Length(body_start + len));
        Some(framing)
    }

    /// Whether `buf` holds the whole message under this framing
    pub fn is_complete(self, buf: &[u8]) -> bool {
        match self {
            Self::NoBody => true,
            Self::Length(total) => buf.len() >= total,
            Self::Chunked => buf.ends_with(CHUNKED_TERMINATOR),
            Self::UntilEof => false,
        }
    }

    /// Whether `buf` is the whole message once the origin has closed
    pub fn is_complete_at_eof(self, buf: &[u8]) -> bool {
        self == Self::UntilEof || self.is_complete(buf)
    }
}

/// Whether `buf` already holds a complete reply to `method`.
pub fn is_complete(method: &str, buf: &[u8]) -> bool {
    Framing::detect(method, buf).is_some_and(|framing| framing.is_complete(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        let resp = OriginResponse::parse(
            b"HTTP/1.1 200 OK\r\nCache-Control: max-age=100\r\nDate: x\r\n\r\n<body>".to_vec(),
        );
        assert_eq!(resp.status_line, "HTTP/1.1 200 OK");
        assert_eq!(resp.status_code(), Some(200));
        assert_eq!(resp.header("cache-control"), Some("max-age=100"));
        assert_eq!(resp.headers.len(), 2);
        assert!(resp.raw.ends_with(b"<body>"));
    }

    #[test]
    fn test_parse_empty_response() {
        let resp = OriginResponse::parse(Vec::new());
        assert_eq!(resp.status_line, "");
        assert_eq!(resp.status_code(), None);
        assert!(resp.headers.is_empty());
    }

    #[test]
    fn test_body_lines_are_not_headers() {
        let resp = OriginResponse::parse(
            b"HTTP/1.1 200 OK\r\nContent-Length: 20\r\n\r\nCache-Control: public".to_vec(),
        );
        assert_eq!(resp.header("cache-control"), None);
    }

    #[test]
    fn test_is_complete_content_length() {
        assert!(!is_complete("GET", b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n"));
        assert!(!is_complete("GET", b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nabc"));
        assert!(is_complete("GET", b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nabcde"));
    }

    #[test]
    fn test_is_complete_chunked() {
        let partial = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n";
        assert!(!is_complete("GET", partial));
        let done = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\n\r\n";
        assert!(is_complete("GET", done));
    }

    #[test]
    fn test_framing_detect() {
        assert_eq!(Framing::detect("GET", b"HTTP/1.1 200 OK\r\n"), None);
        assert_eq!(
            Framing::detect("GET", b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\n"),
            Some(Framing::Length(42))
        );
        assert_eq!(
            Framing::detect("GET", b"HTTP/1.1 204 No Content\r\n\r\n"),
            Some(Framing::NoBody)
        );
    }

    #[test]
    fn test_head_reply_has_no_body() {
        let head = b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n";
        assert_eq!(Framing::detect("HEAD", head), Some(Framing::NoBody));
        assert!(is_complete("head", head));
        assert!(!is_complete("GET", head));
    }

    #[test]
    fn test_complete_at_eof() {
        let short = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nab";
        let framing = Framing::detect("GET", short).unwrap();
        assert!(!framing.is_complete_at_eof(short));

        let open_ended = b"HTTP/1.1 200 OK\r\n\r\nuntil close";
        let framing = Framing::detect("GET", open_ended).unwrap();
        assert!(framing.is_complete_at_eof(open_ended));
    }

    #[test]
    fn test_is_complete_without_framing() {
        assert!(!is_complete("GET", b"HTTP/1.1 200 OK\r\n\r\nbody until eof"));
        assert!(is_complete("GET", b"HTTP/1.1 304 Not Modified\r\n\r\n"));
    }
}
