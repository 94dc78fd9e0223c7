//! Cache key derivation
//!
//! A key is `host + resource`, where the resource always starts with `/`.
//! Keys whose last segment is empty, `.` or `..` get a placeholder file name
//! appended so a key never names a directory.

use std::fmt;

/// Placeholder file name for directory-like targets
pub const DEFAULT_PLACEHOLDER: &str = "default";

/// Identifies one stored response
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    host: String,
    resource: String,
    key: String,
}

impl CacheKey {
    /// Derive the key for a normalized `host[/path]` target.
    ///
    /// Host casing is kept as written, so `Example.com` and `example.com`
    /// are distinct keys.
    pub fn resolve(target: &str, placeholder: &str) -> Self {
        let (host, resource) = match target.split_once('/') {
            Some((host, rest)) => (host, format!("/{rest}")),
            None => (target, "/".to_string()),
        };

        let mut key = format!("{host}{resource}");
        if names_directory(&key) {
            if !key.ends_with('/') {
                key.push('/');
            }
            key.push_str(placeholder);
        }

        Self {
            host: host.to_string(),
            resource,
            key,
        }
    }

    /// Host segment, including any `:port`
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Resource path sent to the origin, always starting with `/`
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

/// A trailing empty, `.` or `..` segment resolves to a directory on disk
fn names_directory(key: &str) -> bool {
    matches!(key.rsplit('/').next(), None | Some("" | "." | ".."))
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
