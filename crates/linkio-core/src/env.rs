//! Environment variable utilities
//!
//! Typed lookups with defaults, used by the logging setup and by
//! `EndpointConfig::from_env()`.
//!
//! ```ignore
//! let mtu: u32 = env_get("LINKIO_MTU", 1500);
//! let tiers: Option<Vec<usize>> = env_get_list("LINKIO_BUF_TIERS");
//! let flush = env_get_bool("LINKIO_FLUSH_EPRINT", false);
//! ```

use std::str::FromStr;

/// Variable parsed as `T`, or `default` when unset or unparsable
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Variable parsed as `T`; `None` when unset or unparsable
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Boolean variable
///
/// "1", "true", "yes", "on" (any case) are true, anything else set is false.
/// Unset returns the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Comma-separated list, e.g. `LINKIO_BUF_TIERS=128,256,512`
///
/// All-or-nothing: a single bad element makes the whole variable `None`.
pub fn env_get_list<T>(key: &str) -> Option<Vec<T>>
where
    T: FromStr,
{
    let raw = std::env::var(key).ok()?;
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect()
}
