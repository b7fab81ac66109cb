//! Cache Module
//!
//! Client-side store of unary call results with lazy TTL expiry and a
//! global byte budget.

mod entry;
mod key;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use key::{derive_key, request_key, KEY_SEPARATOR};
pub use stats::CacheStats;
pub use store::{Cache, KeyPartFn};
