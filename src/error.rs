//! Error types for the RPC cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

use crate::rpc::{Code, Status};

// == Cache Error Enum ==
/// Unified error type for cached calls.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A request or result could not be encoded or decoded
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Cache-control metadata was present but malformed
    #[error("Malformed cache-control directive: {0}")]
    Protocol(String),

    /// A handler set cache control more than once for the same call
    #[error("Cache control already set for this call")]
    DirectiveAlreadySet,

    /// The underlying call failed
    #[error(transparent)]
    Transport(#[from] Status),
}

// == Status Conversion ==
impl From<CacheError> for Status {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Transport(status) => status,
            CacheError::Serialization(e) => Status::internal(e.to_string()),
            CacheError::Protocol(msg) => {
                Status::new(Code::Internal, format!("cache-control: {}", msg))
            }
            e @ CacheError::DirectiveAlreadySet => Status::failed_precondition(e.to_string()),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the RPC cache.
pub type Result<T> = std::result::Result<T, CacheError>;
