//! Cache-Control Module
//!
//! The directive a server attaches to a response to say how long the client
//! may reuse it, and its trailer encoding.
//!
//! # Wire format
//! One trailer entry keyed `cache-control:max-age`. The value is a duration
//! written as an integer count of the largest exact unit (`250ms`, `90s`,
//! `1h`). Decoders also accept compound and fractional forms (`1h30m`,
//! `1.5s`). Negative values mean "do not cache".

mod directive;
mod duration;

pub use directive::{
    cache_control, set_cache_control, CacheControl, LEGACY_EXPIRES_KEY, MAX_AGE_KEY,
};
pub use duration::{format_duration, parse_duration};
