//! Session timing configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_TOKEN_REFRESH_SECS: u64 = 45 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum age of a cached session envelope.
    pub cache_ttl: Duration,
    /// Period of the proactive token refresh.
    pub refresh_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            refresh_interval: Duration::from_secs(DEFAULT_TOKEN_REFRESH_SECS),
        }
    }
}

impl SessionConfig {
    /// Build from environment variables.
    ///
    /// Optional:
    /// - `FLEXRENT_SESSION_TTL_SECS`: default 86400
    /// - `FLEXRENT_TOKEN_REFRESH_SECS`: default 2700, zero falls back to the default
    #[must_use]
    pub fn from_env() -> Self {
        let ttl = env_parse("FLEXRENT_SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS);
        let refresh = match env_parse("FLEXRENT_TOKEN_REFRESH_SECS", DEFAULT_TOKEN_REFRESH_SECS) {
            0 => DEFAULT_TOKEN_REFRESH_SECS,
            secs => secs,
        };
        Self { cache_ttl: Duration::from_secs(ttl), refresh_interval: Duration::from_secs(refresh) }
    }
}

/// Parse `key` from the environment, falling back to `default` when unset or unparseable.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
