//! Cache Entry Module
//!
//! Defines the structure for individual cached call results with expiry.

use std::time::{Duration, Instant};

use crate::control::CacheControl;

// == Cache Entry ==
/// A cached call result together with the directive it was stored under.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Serialized result message
    pub payload: Vec<u8>,
    /// Directive the server sent with the result
    pub control: CacheControl,
    /// Instant after which the entry is dead, None = the clock cannot
    /// represent `stored_at + max_age`, so it never expires
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry stored at `now`. Expiry is fixed here and never
    /// recomputed.
    pub fn new(payload: Vec<u8>, control: CacheControl, now: Instant) -> Self {
        Self {
            payload,
            control,
            expires_at: now.checked_add(control.max_age()),
        }
    }

    // == Is Expired ==
    /// Checks if the entry is dead at `now`.
    ///
    /// An entry is alive up to and including its expiry instant; it is dead
    /// once `now` is strictly past it.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now > expires,
            None => false,
        }
    }

    /// Size the entry counts against the cache budget.
    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }

    // == Time To Live ==
    /// Returns the remaining lifetime at `now`, or None if the entry never
    /// expires.
    pub fn ttl_remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(now))
    }
}
