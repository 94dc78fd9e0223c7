//! Response cache
//!
//! Key derivation from request targets and the on-disk store.

pub mod key;
pub mod store;

pub use key::CacheKey;
pub use store::{CacheLookup, DiskStore};
