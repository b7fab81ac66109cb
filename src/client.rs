//! Cached Client
//!
//! Client wrapper that answers unary calls from the cache when it can and
//! records server-approved results when it cannot.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::Cache;
use crate::error::Result;
use crate::rpc::{CallContext, Channel, UnaryResponse};

// == Cached Client ==
/// Wraps a [`Channel`] with a response cache.
///
/// Concurrent misses for the same request are not coalesced: each issues
/// its own call and the last store wins.
#[derive(Debug, Clone)]
pub struct CachedClient<C> {
    channel: C,
    cache: Arc<Cache>,
}

impl<C: Channel> CachedClient<C> {
    /// Wraps `channel` with a fresh unbounded cache.
    pub fn new(channel: C) -> Self {
        Self::with_cache(channel, Arc::new(Cache::new()))
    }

    /// Wraps `channel` with an existing, possibly shared, cache.
    pub fn with_cache(channel: C, cache: Arc<Cache>) -> Self {
        Self { channel, cache }
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    // == Call ==
    /// Calls `method` with `request`, going through the cache.
    ///
    /// On a hit no call is made. On a miss the real call runs, any
    /// cache-control directive in its trailer is honored, and the real
    /// result is returned. Transport errors are returned unchanged and
    /// nothing is cached for them.
    pub async fn call<Req, Resp>(
        &self,
        ctx: &CallContext,
        method: &str,
        request: &Req,
    ) -> Result<Resp>
    where
        Req: Serialize + Sync + ?Sized,
        Resp: Serialize + DeserializeOwned,
    {
        if let Some(cached) = self.cache.get(ctx, method, request)? {
            return Ok(cached);
        }

        let response = self.invoke(ctx, method, request).await?;
        let result: Resp = serde_json::from_slice(&response.payload)?;
        self.cache
            .store(ctx, method, request, &result, &response.trailers)?;

        Ok(result)
    }

    /// Calls `method` without reading or writing the cache.
    pub async fn call_uncached<Req, Resp>(
        &self,
        ctx: &CallContext,
        method: &str,
        request: &Req,
    ) -> Result<Resp>
    where
        Req: Serialize + Sync + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self.invoke(ctx, method, request).await?;
        Ok(serde_json::from_slice(&response.payload)?)
    }

    async fn invoke<Req>(
        &self,
        ctx: &CallContext,
        method: &str,
        request: &Req,
    ) -> Result<UnaryResponse>
    where
        Req: Serialize + Sync + ?Sized,
    {
        let payload = serde_json::to_vec(request)?;
        Ok(self.channel.unary(ctx, method, payload).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{CacheControl, MAX_AGE_KEY};
    use crate::error::CacheError;
    use crate::rpc::{Code, Metadata, Status};
    use serde::Deserialize;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Op {
        a: i64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Res {
        x: i64,
    }

    /// Channel that echoes `a` back as `x` with a scripted trailer.
    #[derive(Default)]
    struct ScriptedChannel {
        calls: AtomicUsize,
        trailer: Mutex<Metadata>,
        fail: Mutex<Option<Status>>,
    }

    impl ScriptedChannel {
        fn with_max_age(max_age: Duration) -> Self {
            let channel = Self::default();
            channel.set_max_age(max_age);
            channel
        }

        fn set_max_age(&self, max_age: Duration) {
            let mut trailer = Metadata::new();
            CacheControl::new(max_age).write_to(&mut trailer);
            *self.trailer.lock().unwrap() = trailer;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Channel for ScriptedChannel {
        fn unary(
            &self,
            _ctx: &CallContext,
            _method: &str,
            payload: Vec<u8>,
        ) -> impl Future<Output = std::result::Result<UnaryResponse, Status>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = match self.fail.lock().unwrap().clone() {
                Some(status) => Err(status),
                None => {
                    let op: Op = serde_json::from_slice(&payload).unwrap();
                    Ok(UnaryResponse {
                        payload: serde_json::to_vec(&Res { x: op.a }).unwrap(),
                        trailers: self.trailer.lock().unwrap().clone(),
                    })
                }
            };
            async move { outcome }
        }
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let client = CachedClient::new(ScriptedChannel::with_max_age(Duration::from_secs(60)));
        let ctx = CallContext::new();

        let first: Res = client.call(&ctx, "Svc.Get", &Op { a: 1 }).await.unwrap();
        let second: Res = client.call(&ctx, "Svc.Get", &Op { a: 1 }).await.unwrap();

        assert_eq!(first, Res { x: 1 });
        assert_eq!(second, first);
        assert_eq!(client.channel().calls(), 1);
        assert_eq!(client.cache().stats().hits, 1);
    }

    #[tokio::test]
    async fn test_no_directive_is_not_cached() {
        let client = CachedClient::new(ScriptedChannel::default());
        let ctx = CallContext::new();

        for _ in 0..3 {
            let _: Res = client.call(&ctx, "Svc.Get", &Op { a: 1 }).await.unwrap();
        }
        assert_eq!(client.channel().calls(), 3);
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_propagates_unchanged() {
        let channel = ScriptedChannel::with_max_age(Duration::from_secs(60));
        *channel.fail.lock().unwrap() = Some(Status::unavailable("backend down"));
        let client = CachedClient::new(channel);

        let err = client
            .call::<_, Res>(&CallContext::new(), "Svc.Get", &Op { a: 1 })
            .await
            .unwrap_err();

        match err {
            CacheError::Transport(status) => {
                assert_eq!(status.code(), Code::Unavailable);
                assert_eq!(status.message(), "backend down");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_directive_fails_call() {
        let channel = ScriptedChannel::default();
        *channel.trailer.lock().unwrap() = [(MAX_AGE_KEY, "eventually")].into_iter().collect();
        let client = CachedClient::new(channel);

        let err = client
            .call::<_, Res>(&CallContext::new(), "Svc.Get", &Op { a: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_call_uncached_bypasses_cache() {
        let client = CachedClient::new(ScriptedChannel::with_max_age(Duration::from_secs(60)));
        let ctx = CallContext::new();

        let _: Res = client.call(&ctx, "Svc.Get", &Op { a: 1 }).await.unwrap();
        let res: Res = client
            .call_uncached(&ctx, "Svc.Get", &Op { a: 1 })
            .await
            .unwrap();

        assert_eq!(res, Res { x: 1 });
        assert_eq!(client.channel().calls(), 2);
        assert_eq!(client.cache().stats().hits, 0);
    }

    #[tokio::test]
    async fn test_shared_cache_and_clear() {
        let cache = Arc::new(Cache::new());
        let client = CachedClient::with_cache(
            ScriptedChannel::with_max_age(Duration::from_secs(60)),
            Arc::clone(&cache),
        );
        let ctx = CallContext::new();

        let _: Res = client.call(&ctx, "Svc.Get", &Op { a: 1 }).await.unwrap();
        assert_eq!(cache.len(), 1);

        cache.clear();
        let _: Res = client.call(&ctx, "Svc.Get", &Op { a: 1 }).await.unwrap();
        assert_eq!(client.channel().calls(), 2);
    }

    #[tokio::test]
    async fn test_directive_change_applies_to_next_store() {
        let client = CachedClient::new(ScriptedChannel::with_max_age(Duration::from_millis(40)));
        let ctx = CallContext::new();

        let _: Res = client.call(&ctx, "Svc.Get", &Op { a: 1 }).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        client.channel().set_max_age(Duration::ZERO);
        let _: Res = client.call(&ctx, "Svc.Get", &Op { a: 1 }).await.unwrap();
        let _: Res = client.call(&ctx, "Svc.Get", &Op { a: 1 }).await.unwrap();

        assert_eq!(client.channel().calls(), 3);
        assert!(client.cache().is_empty());
    }
}
