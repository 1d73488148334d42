use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::ClientError;

/// Default service base URL for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default status poll interval in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Connection settings shared by every agent.
///
/// Passed explicitly to each component; nothing reads ambient globals
/// after construction.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service base URL including the API prefix.
    pub base_url: String,
    /// Upper bound for a single HTTP request.
    pub request_timeout: Duration,
    /// Delay between status polls.
    pub poll_interval: Duration,
    /// Headers sent with every request.
    pub default_headers: HeaderMap,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            default_headers: HeaderMap::new(),
        }
    }
}

impl ClientConfig {
    /// Build a config for the given base URL with default timings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default                         |
    /// |---------------------------------|---------------------------------|
    /// | `CELLFLOW_API_URL`              | `http://localhost:8000/api/v1`  |
    /// | `CELLFLOW_REQUEST_TIMEOUT_SECS` | `30`                            |
    /// | `CELLFLOW_POLL_INTERVAL_SECS`   | `2`                             |
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url =
            std::env::var("CELLFLOW_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());

        let request_timeout_secs =
            secs_from_env("CELLFLOW_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        let poll_interval_secs =
            secs_from_env("CELLFLOW_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;

        let config = Self {
            base_url,
            request_timeout: Duration::from_secs(request_timeout_secs),
            poll_interval: Duration::from_secs(poll_interval_secs),
            default_headers: HeaderMap::new(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Add a header sent with every request.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ClientError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::Config(format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::Config(format!("invalid value for header '{name}': {e}")))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Reject zero durations and unparseable base URLs.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.request_timeout.is_zero() {
            return Err(ClientError::Config(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(ClientError::Config(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ClientError::Config(format!("invalid base URL '{}': {e}", self.base_url)))?;
        if url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "base URL '{}' cannot carry a path",
                self.base_url
            )));
        }
        Ok(())
    }

    /// Build the shared HTTP client carrying the timeout and headers.
    pub fn http_client(&self) -> Result<reqwest::Client, ClientError> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .default_headers(self.default_headers.clone())
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))
    }
}

fn secs_from_env(var: &str, default: u64) -> Result<u64, ClientError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ClientError::Config(format!("{var} must be a whole number of seconds"))),
        Err(_) => Ok(default),
    }
}
