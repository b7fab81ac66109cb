//! RPC Cache - A transparent response cache for unary RPC calls
//!
//! Servers decide per call how long a result may be reused by attaching a
//! max-age directive to the response trailer; clients keep approved results
//! in a size-bounded, TTL-expiring cache and answer repeat calls from it.

pub mod cache;
pub mod client;
pub mod config;
pub mod control;
pub mod error;
pub mod rpc;
pub mod server;

pub use cache::{Cache, CacheStats};
pub use client::CachedClient;
pub use config::CacheConfig;
pub use control::{set_cache_control, CacheControl};
pub use error::{CacheError, Result};
pub use server::CachedHandler;
