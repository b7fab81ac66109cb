//! Client Channels
//!
//! The client-facing half of the transport.

use std::future::Future;
use std::sync::Arc;

use crate::rpc::{CallContext, Server, Status, UnaryResponse};

// == Channel ==
/// Issues unary calls on behalf of a client.
pub trait Channel: Send + Sync {
    /// Sends `payload` to `method` and waits for the response and its trailer.
    fn unary(
        &self,
        ctx: &CallContext,
        method: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<UnaryResponse, Status>> + Send;
}

impl<C: Channel> Channel for Arc<C> {
    fn unary(
        &self,
        ctx: &CallContext,
        method: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<UnaryResponse, Status>> + Send {
        (**self).unary(ctx, method, payload)
    }
}

// == Local Channel ==
/// In-process channel that dispatches straight into a [`Server`].
///
/// Request metadata from the [`CallContext`] is forwarded to the server
/// context the way a network transport would send headers.
#[derive(Clone)]
pub struct LocalChannel {
    server: Arc<Server>,
}

impl LocalChannel {
    pub fn new(server: Arc<Server>) -> Self {
        Self { server }
    }
}

impl Channel for LocalChannel {
    fn unary(
        &self,
        ctx: &CallContext,
        method: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<UnaryResponse, Status>> + Send {
        let server = Arc::clone(&self.server);
        let metadata = ctx.metadata().clone();
        let method = method.to_string();
        async move { server.handle(metadata, &method, payload).await }
    }
}
