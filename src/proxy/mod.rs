//! Proxy core
//!
//! Origin fetching and the per-connection dispatcher that combines the
//! parser, cache store and caching policy.

pub mod dispatcher;
pub mod fetcher;

pub use dispatcher::{CacheStatus, Dispatcher};
pub use fetcher::OriginFetcher;
