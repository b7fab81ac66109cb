//! Cached Server Handlers
//!
//! Server-side wrapper that turns the directive a handler records with
//! [`set_cache_control`](crate::control::set_cache_control) into a response
//! trailer.

use std::sync::Arc;

use tracing::debug;

use crate::control::cache_control;
use crate::rpc::{BoxFuture, Metadata, Server, ServerContext, Status, UnaryHandler};

// == Cached Handler ==
/// Wraps a handler so its cache-control directive reaches the client.
///
/// The directive is written as the call's trailer, so a wrapped handler that
/// sets cache control must not also write a trailer of its own: the second
/// write fails with `FailedPrecondition`. Handler errors pass through
/// unchanged and carry no directive.
pub struct CachedHandler<H> {
    inner: H,
}

impl<H: UnaryHandler> CachedHandler<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H: UnaryHandler> UnaryHandler for CachedHandler<H> {
    fn call(
        &self,
        ctx: Arc<ServerContext>,
        payload: Vec<u8>,
    ) -> BoxFuture<'static, Result<Vec<u8>, Status>> {
        let fut = self.inner.call(Arc::clone(&ctx), payload);
        Box::pin(async move {
            let response = fut.await?;

            if let Some(control) = cache_control(&ctx) {
                let mut trailer = Metadata::new();
                control.write_to(&mut trailer);
                ctx.set_trailer(trailer)?;
                debug!(
                    "{}: attached max-age {:?}",
                    ctx.method(),
                    control.max_age()
                );
            }

            Ok(response)
        })
    }
}

impl Server {
    /// Registers `handler` under `method` behind a [`CachedHandler`].
    pub fn add_cached(self, method: impl Into<String>, handler: impl UnaryHandler) -> Self {
        self.add(method, CachedHandler::new(handler))
    }
}
