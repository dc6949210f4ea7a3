//! Configuration for the Rubble client

use crate::error::{Result, RubbleError};
use std::fmt;

/// Default server root
pub const DEFAULT_SERVER_URL: &str = "https://rubble2.labs.rubble.tech/";

/// Path of the REST service below the server root
pub const DEFAULT_SERVICE_PATH: &str = "rubble/service/";

/// Client configuration
///
/// Immutable once handed to [`RubbleClient::new`](crate::RubbleClient::new).
#[derive(Clone)]
pub struct ClientConfig {
    /// Server root URL, e.g. `http://localhost:8082/`
    pub base_url: String,
    /// Path of the REST service below `base_url`
    pub service_path: String,
    /// API key (HTTP Basic username)
    pub api_key: String,
    /// API secret (HTTP Basic password)
    pub api_secret: String,
    /// `User-Agent` header sent with every request
    pub user_agent: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Skip TLS certificate verification (development servers only)
    pub accept_invalid_certs: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVER_URL.to_string(),
            service_path: DEFAULT_SERVICE_PATH.to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            user_agent: format!("rubble-client/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            accept_invalid_certs: false,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("service_path", &self.service_path)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("timeout_secs", &self.timeout_secs)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

impl ClientConfig {
    /// Config for the given server and credentials, everything else default
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            ..Default::default()
        }
    }

    /// Create config from environment variables
    ///
    /// Reads `RUBBLE_SERVER_URL`, `RUBBLE_API_KEY`, `RUBBLE_API_PASSWORD`,
    /// `RUBBLE_TIMEOUT_SECS` and `RUBBLE_ACCEPT_INVALID_CERTS`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let base_url =
            std::env::var("RUBBLE_SERVER_URL").unwrap_or_else(|_| defaults.base_url.clone());

        let api_key = std::env::var("RUBBLE_API_KEY").unwrap_or_default();
        let api_secret = std::env::var("RUBBLE_API_PASSWORD").unwrap_or_default();

        let timeout_secs = std::env::var("RUBBLE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        let accept_invalid_certs = std::env::var("RUBBLE_ACCEPT_INVALID_CERTS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let config = Self {
            base_url,
            api_key,
            api_secret,
            timeout_secs,
            accept_invalid_certs,
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the config can be used to talk to a server
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() || self.api_secret.is_empty() {
            return Err(RubbleError::Config(
                "an API key and API secret must be supplied, or set RUBBLE_API_KEY and RUBBLE_API_PASSWORD"
                    .to_string(),
            ));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(RubbleError::Config(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }
        Ok(())
    }

    /// URL of a service endpoint, e.g. `endpoint("call")`
    pub fn endpoint(&self, name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.service_path.trim_matches('/'),
            name
        )
    }
}
