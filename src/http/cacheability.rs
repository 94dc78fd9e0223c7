//! Storage policy for origin responses

use super::response::OriginResponse;

/// Status codes that are never stored, matched anywhere in the status line
const UNCACHEABLE_STATUS: [&str; 3] = ["404", "301", "302"];

/// Decide whether an origin response may be stored.
///
/// Cacheable by default. Once any `Cache-Control` line is present the response
/// is cacheable only if some `Cache-Control` line mentions `public` or
/// `max-age`. A 404/301/302 status line overrides everything.
pub fn is_cacheable(response: &OriginResponse) -> bool {
    if UNCACHEABLE_STATUS
        .iter()
        .any(|code| response.status_line.contains(code))
    {
        return false;
    }

    let mut cache_control = response
        .headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("cache-control"))
        .map(|(_, value)| value.to_ascii_lowercase())
        .peekable();

    if cache_control.peek().is_none() {
        return true;
    }
    cache_control.any(|value| value.contains("public") || value.contains("max-age"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(raw: &str) -> OriginResponse {
        OriginResponse::parse(raw.as_bytes().to_vec())
    }

    #[test]
    fn test_default_cacheable() {
        assert!(is_cacheable(&response("HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n")));
    }

    #[test]
    fn test_cache_control_tokens() {
        assert!(is_cacheable(&response(
            "HTTP/1.1 200 OK\r\nCache-Control: public\r\n\r\n"
        )));
        assert!(is_cacheable(&response(
            "HTTP/1.1 200 OK\r\ncache-control: Max-Age=30\r\n\r\n"
        )));
        assert!(!is_cacheable(&response(
            "HTTP/1.1 200 OK\r\nCache-Control: no-store\r\n\r\n"
        )));
        assert!(is_cacheable(&response(
            "HTTP/1.1 200 OK\r\nCache-Control: no-transform\r\nCache-Control: public\r\n\r\n"
        )));
    }

    #[test]
    fn test_status_overrides_headers() {
        for status in ["404 Not Found", "301 Moved Permanently", "302 Found"] {
            let raw = format!("HTTP/1.1 {status}\r\nCache-Control: public, max-age=60\r\n\r\n");
            assert!(!is_cacheable(&response(&raw)), "{status} must not be cached");
        }
    }

    #[test]
    fn test_body_is_not_inspected() {
        assert!(is_cacheable(&response(
            "HTTP/1.1 200 OK\r\nContent-Length: 22\r\n\r\nCache-Control: no-store"
        )));
    }
}
