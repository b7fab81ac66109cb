//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;

/// Cache configuration parameters.
///
/// Values can be set via environment variables and fall back to defaults.
/// The key partition function is not configurable here; set it in code with
/// [`Cache::with_key_part`](crate::cache::Cache::with_key_part).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Byte budget for cached payloads, 0 = unbounded
    pub max_size: u64,
    /// Emit human-readable hit/miss/store/expire diagnostics
    pub log: bool,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `RPC_CACHE_MAX_SIZE` - Byte budget (default: 0, unbounded)
    /// - `RPC_CACHE_LOG` - `1`, `true`, `yes` or `on` to enable diagnostics (default: off)
    pub fn from_env() -> Self {
        Self {
            max_size: env::var("RPC_CACHE_MAX_SIZE")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
            log: env::var("RPC_CACHE_LOG")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.max_size, 0);
        assert!(!config.log);
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the environment to avoid races between tests
        env::remove_var("RPC_CACHE_MAX_SIZE");
        env::remove_var("RPC_CACHE_LOG");
        assert_eq!(CacheConfig::from_env(), CacheConfig::default());

        env::set_var("RPC_CACHE_MAX_SIZE", "65536");
        env::set_var("RPC_CACHE_LOG", "TRUE");
        let config = CacheConfig::from_env();
        assert_eq!(config.max_size, 65536);
        assert!(config.log);

        env::set_var("RPC_CACHE_MAX_SIZE", "lots");
        env::set_var("RPC_CACHE_LOG", "nope");
        assert_eq!(CacheConfig::from_env(), CacheConfig::default());

        env::remove_var("RPC_CACHE_MAX_SIZE");
        env::remove_var("RPC_CACHE_LOG");
    }

    #[test]
    fn test_parse_flag() {
        for on in ["1", "true", "Yes", " on "] {
            assert!(parse_flag(on), "{:?}", on);
        }
        for off in ["0", "false", "", "enabled"] {
            assert!(!parse_flag(off), "{:?}", off);
        }
    }
}
