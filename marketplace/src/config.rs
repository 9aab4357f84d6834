//! REST and identity-provider endpoints parsed from environment variables.

use std::time::Duration;

use session::config::env_parse;

use crate::error::ApiError;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_SECURETOKEN_BASE_URL: &str = "https://securetoken.googleapis.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Backend REST API root, without a trailing slash.
    pub api_base_url: String,
    /// Firebase web API key. Sign-in is unavailable without it.
    pub firebase_api_key: Option<String>,
    pub identity_base_url: String,
    pub securetoken_base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            firebase_api_key: None,
            identity_base_url: DEFAULT_IDENTITY_BASE_URL.to_owned(),
            securetoken_base_url: DEFAULT_SECURETOKEN_BASE_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl ApiConfig {
    /// Build from environment variables.
    ///
    /// Optional:
    /// - `FLEXRENT_API_BASE_URL`: default `http://127.0.0.1:8080`
    /// - `FLEXRENT_FIREBASE_API_KEY`
    /// - `FLEXRENT_IDENTITY_BASE_URL`, `FLEXRENT_SECURETOKEN_BASE_URL`: Google endpoints by default
    /// - `FLEXRENT_HTTP_TIMEOUT_SECS`: default 30
    /// - `FLEXRENT_HTTP_CONNECT_TIMEOUT_SECS`: default 10
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_base_url: env_url("FLEXRENT_API_BASE_URL", DEFAULT_API_BASE_URL),
            firebase_api_key: std::env::var("FLEXRENT_FIREBASE_API_KEY")
                .ok()
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty()),
            identity_base_url: env_url("FLEXRENT_IDENTITY_BASE_URL", DEFAULT_IDENTITY_BASE_URL),
            securetoken_base_url: env_url("FLEXRENT_SECURETOKEN_BASE_URL", DEFAULT_SECURETOKEN_BASE_URL),
            timeout: Duration::from_secs(env_parse("FLEXRENT_HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)),
            connect_timeout: Duration::from_secs(env_parse(
                "FLEXRENT_HTTP_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )),
        }
    }

    /// Replace the backend root, e.g. from a CLI flag.
    #[must_use]
    pub fn with_api_base_url(mut self, url: &str) -> Self {
        self.api_base_url = normalize_url(url);
        self
    }

    /// Shared HTTP client with the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn http_client(&self) -> Result<reqwest::Client, ApiError> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))
    }
}

fn env_url(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| default.to_owned(), |v| normalize_url(&v))
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_owned()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
