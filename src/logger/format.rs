//! Access log format module
//!
//! Supports multiple log formats:
//! - `combined` (Apache/Nginx combined format plus cache outcome)
//! - `common` (Common Log Format - CLF)
//! - `json` (JSON structured logging)
//! - Custom patterns with variables

use chrono::Local;

/// Access log entry for one proxied request
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    /// Client IP address
    pub remote_addr: String,
    /// Request timestamp
    pub time: chrono::DateTime<Local>,
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Normalized request target (`host/path`)
    pub target: String,
    /// Protocol token from the request line (e.g. `HTTP/1.1`)
    pub http_version: String,
    /// Status code of the relayed response, `None` when nothing was relayed
    pub status: Option<u16>,
    /// Bytes relayed to the client
    pub bytes_sent: usize,
    /// Cache outcome (`HIT`, `MISS`, `STALE`, `BYPASS`, `ERROR`)
    pub cache_status: &'static str,
    /// Request processing time in microseconds
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Create a new access log entry with current timestamp
    pub fn new(remote_addr: String, method: String, target: String, http_version: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            target,
            http_version,
            status: None,
            bytes_sent: 0,
            cache_status: "MISS",
            request_time_us: 0,
        }
    }

    /// Format the log entry according to the specified format
    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => self.format_combined(),
            "common" => self.format_common(),
            "json" => self.format_json(),
            custom => self.format_custom(custom),
        }
    }

    fn status_str(&self) -> String {
        self.status.map_or_else(|| "-".to_string(), |s| s.to_string())
    }

    /// Combined-style line with cache outcome and timing
    /// `$remote_addr - - [$time_local] "$request" $status $bytes_sent $cache_status $request_time`
    fn format_combined(&self) -> String {
        format!(
            "{} {} {:.3}",
            self.format_common(),
            self.cache_status,
            self.request_time_secs()
        )
    }

    /// Common Log Format (CLF)
    /// `$remote_addr - - [$time_local] "$request" $status $bytes_sent`
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{} {} {}\" {} {}",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.method,
            self.target,
            self.http_version,
            self.status_str(),
            self.bytes_sent,
        )
    }

    /// JSON structured log format
    fn format_json(&self) -> String {
        // Manual JSON building to avoid serde dependency for simple case
        let status_json = self
            .status
            .map_or_else(|| "null".to_string(), |s| s.to_string());

        format!(
            r#"{{"remote_addr":"{}","time":"{}","method":"{}","target":"{}","http_version":"{}","status":{},"bytes_sent":{},"cache_status":"{}","request_time_us":{}}}"#,
            escape_json(&self.remote_addr),
            self.time.to_rfc3339(),
            escape_json(&self.method),
            escape_json(&self.target),
            escape_json(&self.http_version),
            status_json,
            self.bytes_sent,
            self.cache_status,
            self.request_time_us,
        )
    }

    /// Custom format with variable substitution
    ///
    /// Supported variables:
    /// - `$remote_addr` - Client IP address
    /// - `$time_local` - Local time in Common Log Format
    /// - `$time_iso8601` - ISO 8601 timestamp
    /// - `$request` - Full request line ("METHOD target VERSION")
    /// - `$request_method` - HTTP method
    /// - `$request_uri` - Normalized target
    /// - `$status` - Relayed status code, `-` if none
    /// - `$bytes_sent` - Bytes relayed to the client
    /// - `$cache_status` - Cache outcome
    /// - `$request_time` - Request processing time in seconds (3 decimal places)
    fn format_custom(&self, pattern: &str) -> String {
        let mut result = pattern.to_string();

        let request_line = format!("{} {} {}", self.method, self.target, self.http_version);

        result = result.replace("$remote_addr", &self.remote_addr);
        result = result.replace(
            "$time_local",
            &self.time.format("%d/%b/%Y:%H:%M:%S %z").to_string(),
        );
        result = result.replace("$time_iso8601", &self.time.to_rfc3339());
        // Order matters: longer variables first to avoid partial replacement
        // $request_time must come before $request
        result = result.replace(
            "$request_time",
            &format!("{:.3}", self.request_time_secs()),
        );
        result = result.replace("$request_method", &self.method);
        result = result.replace("$request_uri", &self.target);
        result = result.replace("$request", &request_line);
        result = result.replace("$status", &self.status_str());
        result = result.replace("$bytes_sent", &self.bytes_sent.to_string());
        result = result.replace("$cache_status", self.cache_status);

        result
    }

    #[allow(clippy::cast_precision_loss)]
    fn request_time_secs(&self) -> f64 {
        self.request_time_us as f64 / 1_000_000.0
    }
}

/// Escape special characters for JSON string
fn escape_json(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}
