use std::time::Duration;

use tripkit_core::env;
use tripkit_core::error::CoreError;
use tripkit_core::retry::{BackoffPolicy, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT};

/// Backend client configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, without trailing slash (default: `http://localhost:8000`).
    pub base_url: String,
    /// Bearer token attached to every request when present.
    pub api_token: Option<String>,
    /// Per-attempt deadline for requests that do not set their own.
    pub request_timeout: Duration,
    /// Retries after the first attempt for requests that do not set their own.
    pub max_retries: u32,
    /// Backoff curve between attempts.
    pub backoff: BackoffPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            api_token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default                  |
    /// |-----------------------|--------------------------|
    /// | `API_BASE_URL`        | `http://localhost:8000`  |
    /// | `API_TOKEN`           | unset                    |
    /// | `REQUEST_TIMEOUT_MS`  | `30000`                  |
    /// | `MAX_RETRIES`         | `3`                      |
    /// | `RETRY_BASE_DELAY_MS` | `1000`                   |
    /// | `RETRY_MAX_DELAY_MS`  | `30000`                  |
    pub fn from_env() -> Result<Self, CoreError> {
        let defaults = Self::default();

        let base_url = env::string_optional("API_BASE_URL")
            .unwrap_or(defaults.base_url)
            .trim_end_matches('/')
            .to_string();

        let timeout_ms = env::parse_or(
            "REQUEST_TIMEOUT_MS",
            defaults.request_timeout.as_millis() as u64,
        )?;
        if timeout_ms == 0 {
            return Err(CoreError::Validation(
                "REQUEST_TIMEOUT_MS must be greater than zero".into(),
            ));
        }

        let base_delay_ms = env::parse_or(
            "RETRY_BASE_DELAY_MS",
            defaults.backoff.base_delay.as_millis() as u64,
        )?;
        let max_delay_ms = env::parse_or(
            "RETRY_MAX_DELAY_MS",
            defaults.backoff.max_delay.as_millis() as u64,
        )?;

        Ok(Self {
            base_url,
            api_token: env::string_optional("API_TOKEN"),
            request_timeout: Duration::from_millis(timeout_ms),
            max_retries: env::parse_or("MAX_RETRIES", defaults.max_retries)?,
            backoff: BackoffPolicy {
                base_delay: Duration::from_millis(base_delay_ms),
                max_delay: Duration::from_millis(max_delay_ms),
                ..defaults.backoff
            },
        })
    }
}
