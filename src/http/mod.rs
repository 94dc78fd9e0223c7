//! HTTP protocol layer module
//!
//! Message framing and the caching policy decisions taken on HTTP headers,
//! decoupled from the transport and the disk store.

pub mod cacheability;
pub mod freshness;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use cacheability::is_cacheable;
pub use freshness::is_fresh;
pub use request::Request;
pub use response::OriginResponse;
