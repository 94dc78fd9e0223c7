//! Freshness evaluation for stored responses
//!
//! A stored response is fresh unless it carries both `Cache-Control: max-age`
//! and a parseable `Date`, and the current time is past `Date + max-age`.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use regex::Regex;

static MAX_AGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"max-age=(\d+)").expect("max-age regex is valid"));

/// `Date` layout without the weekday and the zone name; the zone is read as UTC
const DATE_FORMAT: &str = "%d %b %Y %H:%M:%S";

/// `max-age` of the last `Cache-Control` header line, if that line has one
pub fn max_age(headers: &[(String, String)]) -> Option<u64> {
    let value = last_header(headers, "cache-control")?.to_ascii_lowercase();
    MAX_AGE
        .captures(&value)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse a `Date` header value such as `Sun, 06 Nov 1994 08:49:37 GMT`.
///
/// The zone name is ignored and the time read as UTC. The weekday name is
/// skipped without checking it against the date.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let without_zone = match value.rsplit_once(' ') {
        Some((rest, zone)) if zone.chars().all(|c| c.is_ascii_alphabetic()) => rest,
        _ => value,
    };
    let without_weekday = without_zone
        .split_once(", ")
        .map_or(without_zone, |(_, date)| date);
    NaiveDateTime::parse_from_str(without_weekday, DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Whether a response dated `date` with lifetime `max_age` is still valid at `now`
pub fn is_valid_cache(date: DateTime<Utc>, max_age: u64, now: DateTime<Utc>) -> bool {
    let expires = i64::try_from(max_age)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|lifetime| date.checked_add_signed(lifetime));

    // A lifetime past the representable range never expires
    expires.map_or(true, |expires| now <= expires)
}

/// Freshness of a stored response given its header lines.
///
/// Missing `max-age` or missing `Date` means there is no freshness metadata
/// and the entry is served. An unparseable `Date` is treated the same way.
pub fn is_fresh(headers: &[(String, String)], now: DateTime<Utc>) -> bool {
    let Some(max_age) = max_age(headers) else {
        return true;
    };
    let Some(date) = last_header(headers, "date").and_then(parse_date) else {
        return true;
    };
    is_valid_cache(date, max_age, now)
}

fn last_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .rev()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(n, v)| ((*n).to_string(), (*v).to_string()))
            .collect()
    }

    fn t0() -> DateTime<Utc> {
        parse_date("Sun, 06 Nov 1994 08:49:37 GMT").unwrap()
    }

    #[test]
    fn test_parse_date() {
        let date = t0();
        assert_eq!(date.to_rfc3339(), "1994-11-06T08:49:37+00:00");
        // Zone name is ignored
        assert_eq!(parse_date("Sun, 06 Nov 1994 08:49:37 PST"), Some(date));
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn test_parse_date_ignores_weekday() {
        assert_eq!(parse_date("Mon, 06 Nov 1994 08:49:37 GMT"), Some(t0()));

        let h = headers(&[
            ("Date", "Mon, 06 Nov 1994 08:49:37 GMT"),
            ("Cache-Control", "max-age=60"),
        ]);
        assert!(!is_fresh(&h, t0() + TimeDelta::seconds(61)));
    }

    #[test]
    fn test_max_age() {
        let h = headers(&[("Cache-Control", "public, Max-Age=60")]);
        assert_eq!(max_age(&h), Some(60));
        let h = headers(&[("cache-control", "no-cache")]);
        assert_eq!(max_age(&h), None);
        assert_eq!(max_age(&[]), None);
    }

    #[test]
    fn test_freshness_boundary() {
        let h = headers(&[
            ("Date", "Sun, 06 Nov 1994 08:49:37 GMT"),
            ("Cache-Control", "max-age=60"),
        ]);
        assert!(is_fresh(&h, t0() + TimeDelta::seconds(59)));
        assert!(is_fresh(&h, t0() + TimeDelta::seconds(60)));
        assert!(!is_fresh(&h, t0() + TimeDelta::seconds(61)));
    }

    #[test]
    fn test_missing_metadata_is_fresh() {
        let far_future = t0() + TimeDelta::days(10_000);
        let h = headers(&[("Cache-Control", "max-age=60")]);
        assert!(is_fresh(&h, far_future));
        let h = headers(&[("Date", "Sun, 06 Nov 1994 08:49:37 GMT")]);
        assert!(is_fresh(&h, far_future));
    }

    #[test]
    fn test_unparseable_date_is_fresh() {
        let h = headers(&[("Date", "yesterday"), ("Cache-Control", "max-age=0")]);
        assert!(is_fresh(&h, Utc::now()));
    }

    #[test]
    fn test_huge_max_age() {
        assert!(is_valid_cache(t0(), u64::MAX, Utc::now()));
    }
}
