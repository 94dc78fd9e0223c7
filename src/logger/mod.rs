//! Logger module
//!
//! Provides logging utilities for the proxy including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Error and warning logging
//! - Per-request diagnostics at `debug` level
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
        config.logging.is_verbose(),
    )
}

/// Write to info/access log
pub fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

/// Write to error log
pub fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

/// Write to access log specifically
fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

/// Write a diagnostic line, only when `logging.level` is debug or trace
pub fn log_debug(message: &str) {
    if writer::get().is_some_and(writer::LogWriter::is_verbose) {
        write_info(&format!("[DEBUG] {message}"));
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("Caching proxy started successfully");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Cache directory: {}", config.cache.dir));
    if !config.cache.enabled {
        write_info("Caching disabled: every request goes to the origin");
    }
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(max) = config.performance.max_connections {
        write_info(&format!("Max connections: {max}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

pub fn log_shutdown(active: usize) {
    write_info(&format!(
        "[Shutdown] Stopped accepting connections ({active} still in flight)"
    ));
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_info(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

pub fn log_malformed_request(peer_addr: &SocketAddr, err: &impl std::fmt::Display) {
    log_warning(&format!("Dropping request from {peer_addr}: {err}"));
}

pub fn log_origin_failure(err: &impl std::fmt::Display) {
    log_error(&format!("[Origin] {err}"));
}

pub fn log_cache_read_failure(err: &impl std::fmt::Display) {
    log_warning(&format!("[Cache] {err}; treating as miss"));
}

pub fn log_cache_write_failure(err: &impl std::fmt::Display) {
    log_error(&format!("[Cache] {err}; response relayed uncached"));
}

pub fn log_cache_stored(key: &str, size: usize) {
    log_debug(&format!("[Cache] Stored {key} ({size} bytes)"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}
