//! Server Side Dispatch
//!
//! Method router and the handler abstraction it dispatches to.

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::rpc::{Metadata, ServerContext, Status};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// == Unary Response ==
/// The result of a successful unary call as it crosses the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnaryResponse {
    /// Serialized response message
    pub payload: Vec<u8>,
    /// Trailer written by the handler, empty if none
    pub trailers: Metadata,
}

// == Unary Handler ==
/// A byte-level unary method implementation.
pub trait UnaryHandler: Send + Sync + 'static {
    fn call(
        &self,
        ctx: Arc<ServerContext>,
        payload: Vec<u8>,
    ) -> BoxFuture<'static, Result<Vec<u8>, Status>>;
}

impl<H: UnaryHandler + ?Sized> UnaryHandler for Arc<H> {
    fn call(
        &self,
        ctx: Arc<ServerContext>,
        payload: Vec<u8>,
    ) -> BoxFuture<'static, Result<Vec<u8>, Status>> {
        (**self).call(ctx, payload)
    }
}

// == Typed Handler Adapter ==
/// Handler built from a typed async function. See [`handler_fn`].
pub struct HandlerFn<F, Req, Resp> {
    f: F,
    _marker: PhantomData<fn(Req) -> Resp>,
}

/// Wraps a typed async function as a [`UnaryHandler`].
///
/// The request is decoded from JSON before `f` runs and the response is
/// encoded after it returns. Undecodable requests fail with
/// `InvalidArgument` without invoking `f`.
pub fn handler_fn<F, Fut, Req, Resp>(f: F) -> HandlerFn<F, Req, Resp>
where
    F: Fn(Arc<ServerContext>, Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, Status>> + Send + 'static,
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
{
    HandlerFn {
        f,
        _marker: PhantomData,
    }
}

impl<F, Fut, Req, Resp> UnaryHandler for HandlerFn<F, Req, Resp>
where
    F: Fn(Arc<ServerContext>, Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, Status>> + Send + 'static,
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
{
    fn call(
        &self,
        ctx: Arc<ServerContext>,
        payload: Vec<u8>,
    ) -> BoxFuture<'static, Result<Vec<u8>, Status>> {
        let request: Req = match serde_json::from_slice(&payload) {
            Ok(request) => request,
            Err(e) => {
                let status = Status::invalid_argument(format!(
                    "malformed request for {}: {}",
                    ctx.method(),
                    e
                ));
                return Box::pin(async move { Err(status) });
            }
        };

        let fut = (self.f)(ctx, request);
        Box::pin(async move {
            let response = fut.await?;
            serde_json::to_vec(&response)
                .map_err(|e| Status::internal(format!("failed to encode response: {}", e)))
        })
    }
}

// == Server ==
/// Routes unary calls to handlers by full method name.
#[derive(Default)]
pub struct Server {
    handlers: HashMap<String, Arc<dyn UnaryHandler>>,
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `method`, replacing any previous handler.
    pub fn add(mut self, method: impl Into<String>, handler: impl UnaryHandler) -> Self {
        self.handlers.insert(method.into(), Arc::new(handler));
        self
    }

    /// Returns the registered method names, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }

    /// Serves a single unary call.
    pub async fn handle(
        &self,
        metadata: Metadata,
        method: &str,
        payload: Vec<u8>,
    ) -> Result<UnaryResponse, Status> {
        let handler = self
            .handlers
            .get(method)
            .cloned()
            .ok_or_else(|| Status::unimplemented(format!("unknown method {}", method)))?;

        let ctx = Arc::new(ServerContext::new(method, metadata));
        let payload = handler.call(Arc::clone(&ctx), payload).await?;
        let trailers = ctx.trailer();
        debug!(method, trailers = %trailers, "served unary call");

        Ok(UnaryResponse { payload, trailers })
    }
}
