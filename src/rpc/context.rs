//! Call Contexts
//!
//! Per-call state visible to clients and handlers.

use std::sync::OnceLock;

use crate::control::CacheControl;
use crate::rpc::{Metadata, Status};

// == Call Context ==
/// Client-side context for a single call.
///
/// Carries the request metadata sent to the server. The cache's `KeyPart`
/// hook reads it to partition results between callers.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    metadata: Metadata,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a request metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key, value);
        self
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

// == Server Context ==
/// Server-side context for a single call.
///
/// The trailer can be written once per call. A second write fails with
/// `FailedPrecondition`, mirroring RPC transports that flush trailers as a
/// single frame.
#[derive(Debug)]
pub struct ServerContext {
    method: String,
    metadata: Metadata,
    trailer: OnceLock<Metadata>,
    pub(crate) directive: OnceLock<CacheControl>,
}

impl ServerContext {
    pub fn new(method: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            method: method.into(),
            metadata,
            trailer: OnceLock::new(),
            directive: OnceLock::new(),
        }
    }

    /// Full method name of the call being served.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request metadata sent by the client.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Sets the response trailer. May be called at most once per call.
    pub fn set_trailer(&self, trailer: Metadata) -> Result<(), Status> {
        self.trailer.set(trailer).map_err(|_| {
            Status::failed_precondition(format!("trailer already set for {}", self.method))
        })
    }

    /// Returns the trailer that will accompany the response.
    pub fn trailer(&self) -> Metadata {
        self.trailer.get().cloned().unwrap_or_default()
    }
}
