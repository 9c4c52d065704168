//! Construction-time configuration for `DripClient`.

use std::fmt;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::ClientError;

/// Documented base URL of the Drip v2 API.
pub const DEFAULT_BASE_URL: &str = "https://api.getdrip.com/v2";

/// Deadline for one network round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub const API_KEY_ENV: &str = "DRIP_API_KEY";
pub const BASE_URL_ENV: &str = "DRIP_API_URL";

/// API credential plus where and how long to talk to the service.
///
/// `Debug` never prints the key.
#[derive(Clone)]
pub struct ClientConfig {
    api_key: SecretString,
    base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the base URL. An empty string keeps the current one.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        if !base_url.is_empty() {
            self.base_url = base_url.trim_end_matches('/').to_string();
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `DRIP_API_KEY` (required) and `DRIP_API_URL` (optional).
    pub fn from_env() -> Result<Self, ClientError> {
        let key = std::env::var(API_KEY_ENV).map_err(|_| ClientError::MissingEnv(API_KEY_ENV))?;
        let url = std::env::var(BASE_URL_ENV).unwrap_or_default();
        Ok(Self::new(key).with_base_url(&url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_drip_base_url() {
        let config = ClientConfig::new("key");
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn empty_override_keeps_default() {
        let config = ClientConfig::new("key").with_base_url("");
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ClientConfig::new("key").with_base_url("http://localhost:3000/");
        assert_eq!(config.base_url(), "http://localhost:3000");
    }

    #[test]
    fn debug_redacts_key() {
        let config = ClientConfig::new("super-secret");
        let printed = format!("{config:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }

    // Both env cases share one test so they never race each other.
    #[test]
    fn from_env_requires_api_key() {
        std::env::remove_var(API_KEY_ENV);
        std::env::remove_var(BASE_URL_ENV);
        let err = ClientConfig::from_env().unwrap_err();
        assert!(matches!(err, ClientError::MissingEnv(API_KEY_ENV)));

        std::env::set_var(API_KEY_ENV, "from-env");
        std::env::set_var(BASE_URL_ENV, "http://localhost:3000/");
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.api_key(), "from-env");
        assert_eq!(config.base_url(), "http://localhost:3000");

        std::env::remove_var(API_KEY_ENV);
        std::env::remove_var(BASE_URL_ENV);
    }
}
