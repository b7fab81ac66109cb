//! RPC Module
//!
//! A minimal in-process unary RPC layer: metadata, status, per-call contexts,
//! a method router and a client channel. It provides the seams the caching
//! wrappers plug into; connection handling and wire framing are left to real
//! transports.

mod channel;
mod context;
mod metadata;
mod server;
mod status;

pub use channel::{Channel, LocalChannel};
pub use context::{CallContext, ServerContext};
pub use metadata::Metadata;
pub use server::{handler_fn, BoxFuture, HandlerFn, Server, UnaryHandler, UnaryResponse};
pub use status::{Code, Status};
