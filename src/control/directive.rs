//! Cache-Control Directive
//!
//! The per-call cacheability decision a handler sends back to the client,
//! and its encoding in the response trailer.

use std::time::Duration;

use tracing::debug;

use crate::control::duration::{format_duration, parse_duration};
use crate::error::{CacheError, Result};
use crate::rpc::{Metadata, ServerContext};

/// Trailer key carrying the max-age directive.
pub const MAX_AGE_KEY: &str = "cache-control:max-age";

/// Trailer key of the older absolute-expiry scheme. Never written, and
/// ignored when read: it assumes synchronized clocks between peers.
pub const LEGACY_EXPIRES_KEY: &str = "cache-expires";

// == Cache Control ==
/// How long a call's result may be served from the client cache.
///
/// A zero max-age means the result must not be cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CacheControl {
    max_age: Duration,
}

impl CacheControl {
    /// A directive allowing the result to be reused for `max_age`.
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    /// A directive forbidding caching.
    pub fn no_store() -> Self {
        Self::default()
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn is_cacheable(&self) -> bool {
        !self.max_age.is_zero()
    }

    // == Encode ==
    /// Returns the trailer entry for this directive.
    pub fn encode(&self) -> (&'static str, String) {
        (MAX_AGE_KEY, format_duration(self.max_age))
    }

    /// Appends the trailer entry for this directive to `metadata`.
    pub fn write_to(&self, metadata: &mut Metadata) {
        let (key, value) = self.encode();
        metadata.insert(key, value);
    }

    // == Decode ==
    /// Reads a directive from response trailers.
    ///
    /// Returns `Ok(None)` when no directive is present. A present but
    /// unparsable value is a protocol error: it means the peers disagree on
    /// the wire format.
    pub fn decode(metadata: &Metadata) -> Result<Option<Self>> {
        let Some(value) = metadata.get(MAX_AGE_KEY) else {
            if metadata.contains(LEGACY_EXPIRES_KEY) {
                debug!("ignoring legacy {} trailer", LEGACY_EXPIRES_KEY);
            }
            return Ok(None);
        };

        let max_age = parse_duration(value).map_err(CacheError::Protocol)?;
        Ok(Some(Self::new(max_age)))
    }
}

// == Server-Side Setter ==
/// Records the cache-control directive for the call being served.
///
/// Call it at most once per call: the directive travels in the response
/// trailer, and a call has a single trailer. A second call returns
/// [`CacheError::DirectiveAlreadySet`] and leaves the first directive in
/// place. The directive only reaches the client when the method is served
/// through a [`CachedHandler`](crate::server::CachedHandler).
pub fn set_cache_control(ctx: &ServerContext, control: CacheControl) -> Result<()> {
    ctx.directive
        .set(control)
        .map_err(|_| CacheError::DirectiveAlreadySet)
}

/// Returns the directive recorded for this call, if any.
pub fn cache_control(ctx: &ServerContext) -> Option<CacheControl> {
    ctx.directive.get().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cacheability() {
        assert!(CacheControl::new(Duration::from_secs(1)).is_cacheable());
        assert!(!CacheControl::new(Duration::ZERO).is_cacheable());
        assert!(!CacheControl::no_store().is_cacheable());
    }

    #[test]
    fn test_encode_uses_max_age_key() {
        let (key, value) = CacheControl::new(Duration::from_millis(250)).encode();
        assert_eq!(key, "cache-control:max-age");
        assert_eq!(value, "250ms");
    }

    #[test]
    fn test_write_then_decode() {
        let mut md = Metadata::new();
        CacheControl::new(Duration::from_secs(3600)).write_to(&mut md);
        assert_eq!(md.get(MAX_AGE_KEY), Some("1h"));

        let decoded = CacheControl::decode(&md).unwrap().unwrap();
        assert_eq!(decoded.max_age(), Duration::from_secs(3600));
    }

    #[test]
    fn test_decode_absent_is_none() {
        assert!(CacheControl::decode(&Metadata::new()).unwrap().is_none());
    }

    #[test]
    fn test_decode_ignores_legacy_key() {
        let md: Metadata = [(LEGACY_EXPIRES_KEY, "1700000000000000000")]
            .into_iter()
            .collect();
        assert!(CacheControl::decode(&md).unwrap().is_none());
    }

    #[test]
    fn test_decode_malformed_is_protocol_error() {
        let md: Metadata = [(MAX_AGE_KEY, "forever")].into_iter().collect();
        let err = CacheControl::decode(&md).unwrap_err();
        assert!(matches!(err, CacheError::Protocol(_)));
    }

    #[test]
    fn test_decode_negative_is_not_cacheable() {
        let md: Metadata = [(MAX_AGE_KEY, "-1s")].into_iter().collect();
        let decoded = CacheControl::decode(&md).unwrap().unwrap();
        assert!(!decoded.is_cacheable());
    }

    #[test]
    fn test_decode_first_value_wins() {
        let md: Metadata = [(MAX_AGE_KEY, "5s"), (MAX_AGE_KEY, "garbage")]
            .into_iter()
            .collect();
        let decoded = CacheControl::decode(&md).unwrap().unwrap();
        assert_eq!(decoded.max_age(), Duration::from_secs(5));
    }

    #[test]
    fn test_set_cache_control_once() {
        let ctx = ServerContext::new("Svc.Method", Metadata::new());
        assert!(cache_control(&ctx).is_none());

        let first = CacheControl::new(Duration::from_secs(10));
        set_cache_control(&ctx, first).unwrap();

        let err = set_cache_control(&ctx, CacheControl::new(Duration::from_secs(20))).unwrap_err();
        assert!(matches!(err, CacheError::DirectiveAlreadySet));
        assert_eq!(cache_control(&ctx), Some(first));
    }
}
