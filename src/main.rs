//! RPC Cache demo
//!
//! Serves a lookup method in-process and calls it through a cached client,
//! showing hits, tenant partitioning and max-age expiry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rpc_cache::rpc::{handler_fn, CallContext, LocalChannel, Server, ServerContext, Status};
use rpc_cache::{set_cache_control, Cache, CacheConfig, CacheControl, CachedClient};

const LOOKUP_METHOD: &str = "Demo.Lookup";

/// Request header used to partition cached results between tenants.
const TENANT_HEADER: &str = "x-tenant";

#[derive(Debug, Serialize, Deserialize)]
struct LookupRequest {
    a: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct LookupResult {
    x: i64,
}

/// Main entry point for the RPC cache demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load cache configuration from environment variables
/// 3. Register the lookup handler behind the cache-control wrapper
/// 4. Build a cached client over an in-process channel
/// 5. Run the call sequence and report statistics
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rpc_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting RPC cache demo");

    let config = CacheConfig::from_env();
    info!(
        "Configuration loaded: max_size={}, log={}",
        config.max_size, config.log
    );

    let served = Arc::new(AtomicUsize::new(0));
    let server = {
        let served = Arc::clone(&served);
        Server::new().add_cached(
            LOOKUP_METHOD,
            handler_fn(move |ctx: Arc<ServerContext>, req: LookupRequest| {
                let served = Arc::clone(&served);
                async move {
                    served.fetch_add(1, Ordering::SeqCst);
                    // Large ids change often; small ids are stable for an hour
                    let max_age = if req.a >= 100 {
                        Duration::from_millis(250)
                    } else {
                        Duration::from_secs(3600)
                    };
                    set_cache_control(&ctx, CacheControl::new(max_age))?;
                    Ok::<_, Status>(LookupResult { x: req.a })
                }
            }),
        )
    };

    let cache = Cache::from_config(&config).with_key_part(|ctx: &CallContext| {
        ctx.metadata()
            .get(TENANT_HEADER)
            .unwrap_or_default()
            .to_string()
    });
    let client = CachedClient::with_cache(
        LocalChannel::new(Arc::new(server)),
        Arc::new(cache),
    );

    let tenant_a = CallContext::new().with_metadata(TENANT_HEADER, "a");
    let tenant_b = CallContext::new().with_metadata(TENANT_HEADER, "b");

    let steps: [(&CallContext, i64, Option<Duration>); 6] = [
        (&tenant_a, 1, None),
        (&tenant_a, 1, None),
        (&tenant_b, 1, None),
        (&tenant_a, 100, None),
        (&tenant_a, 100, Some(Duration::from_millis(300))),
        (&tenant_a, 100, None),
    ];

    for (ctx, a, pause_before) in steps {
        if let Some(pause) = pause_before {
            tokio::time::sleep(pause).await;
        }
        let before = served.load(Ordering::SeqCst);
        let result: LookupResult = client
            .call(ctx, LOOKUP_METHOD, &LookupRequest { a })
            .await?;
        let source = if served.load(Ordering::SeqCst) == before {
            "cache"
        } else {
            "server"
        };
        info!("lookup a={} -> x={} (from {})", a, result.x, source);
    }

    let stats = client.cache().stats();
    info!(
        "Done: {} server calls, hit rate {:.2}, stats {}",
        served.load(Ordering::SeqCst),
        stats.hit_rate(),
        serde_json::to_string(&stats)?
    );

    Ok(())
}
