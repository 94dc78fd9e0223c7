//! Forward HTTP caching proxy
//!
//! Accepts one request per client connection, answers from a disk cache when
//! a fresh copy exists, otherwise fetches from the origin, stores cacheable
//! responses and relays the bytes unchanged.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod logger;
pub mod proxy;
pub mod server;
