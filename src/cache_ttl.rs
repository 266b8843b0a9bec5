//! Per-resource cache lifetimes.
//!
//! Every resource shares the configured default unless `TTL_<RESOURCE>_SECONDS`
//! is set in the environment.

use std::env;
use std::time::Duration;

use crate::cache_key::CacheResource;

pub const TTL_DEFAULT: u64 = 3600; // 1 hour

/// Get TTL with environment variable override
pub fn ttl_with_env(env_key: &str, default_ttl: u64) -> u64 {
    env::var(env_key)
        .map(|val| val.parse::<u64>().unwrap_or(default_ttl))
        .unwrap_or(default_ttl)
}

/// Environment variable that overrides the TTL of `resource`,
/// e.g. `TTL_ALL_VIDEOS_SECONDS`.
pub fn env_key_for(resource: CacheResource) -> String {
    let name: String = resource
        .as_str()
        .chars()
        .flat_map(|c| {
            if c == '-' {
                vec!['_']
            } else if c.is_ascii_uppercase() {
                vec!['_', c]
            } else {
                vec![c.to_ascii_uppercase()]
            }
        })
        .collect();
    format!("TTL_{}_SECONDS", name)
}

/// TTL for entries of `resource`, falling back to `default_ttl`.
pub fn ttl_for(resource: CacheResource, default_ttl: Duration) -> Duration {
    Duration::from_secs(ttl_with_env(&env_key_for(resource), default_ttl.as_secs()))
}
