//! Deadline-bounded HTTP calls with exponential-backoff retry.
//!
//! [`RequestExecutor`] turns a [`RequestSpec`] into a [`RequestOutcome`].
//! Every attempt races the transport against the request deadline; a
//! transient failure (timeout, network, or an allow-listed status) is retried
//! after a jittered backoff until the retry budget is spent, at which point
//! the last concrete error is returned.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tripkit_core::retry::BackoffPolicy;
use tripkit_core::telemetry::{NoopReporter, Reporter, TelemetryEvent};

use crate::config::ClientConfig;
use crate::error::RequestError;
use crate::request::RequestSpec;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::RequestOutcome;

const NO_CONTENT: u16 = 204;

/// Loop-local bookkeeping for one [`RequestExecutor::send`] call.
#[derive(Debug, Default)]
struct RetryState {
    /// Zero-based index of the attempt in progress.
    attempt: u32,
    last_error: Option<RequestError>,
    last_status: Option<u16>,
}

impl RetryState {
    fn record(&mut self, error: RequestError) {
        self.last_status = error.status();
        self.last_error = Some(error);
    }
}

/// Issues backend calls with a deadline, classification and retry.
///
/// Cheap to share behind an `Arc`; holds no per-call state.
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    base_url: String,
    bearer_token: Option<String>,
    default_timeout: Duration,
    default_max_retries: u32,
    backoff: BackoffPolicy,
    reporter: Arc<dyn Reporter>,
}

impl RequestExecutor {
    /// Create an executor against `base_url` with default policies.
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>) -> Self {
        Self::from_config(
            transport,
            &ClientConfig {
                base_url: base_url.into(),
                ..Default::default()
            },
        )
    }

    /// Create an executor from a loaded [`ClientConfig`].
    pub fn from_config(transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: config.api_token.clone(),
            default_timeout: config.request_timeout,
            default_max_retries: config.max_retries,
            backoff: config.backoff.clone(),
            reporter: Arc::new(NoopReporter),
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run the request and decode a JSON payload.
    ///
    /// A `204 No Content` or empty body decodes from JSON `null`, which
    /// yields `()`, `None` or `Value::Null` without touching the body.
    pub async fn execute<T: DeserializeOwned>(&self, spec: &RequestSpec) -> RequestOutcome<T> {
        let response = self.send(spec).await?;
        decode(spec.endpoint(), &response)
    }

    /// Run the request and return the raw successful response.
    pub async fn send(&self, spec: &RequestSpec) -> RequestOutcome<HttpResponse> {
        let max_retries = if spec.retry_disabled() {
            0
        } else {
            spec.max_retries().unwrap_or(self.default_max_retries)
        };
        let mut state = RetryState::default();

        loop {
            match self.attempt(spec).await {
                Ok(response) => {
                    if state.attempt > 0 {
                        tracing::debug!(
                            endpoint = spec.endpoint(),
                            attempt = state.attempt + 1,
                            previous_status = ?state.last_status,
                            previous_error = ?state.last_error,
                            "Request succeeded after retry",
                        );
                    }
                    return Ok(response);
                }
                Err(err) => {
                    if state.attempt < max_retries && err.is_retryable() {
                        state.attempt += 1;
                        let delay = self.backoff.delay_for(state.attempt);

                        tracing::warn!(
                            endpoint = spec.endpoint(),
                            error = %err,
                            delay_ms = delay.as_millis() as u64,
                            attempt = state.attempt,
                            max_retries,
                            "Request failed, retrying",
                        );
                        self.reporter.report(TelemetryEvent::RequestRetried {
                            endpoint: spec.endpoint().to_string(),
                            attempt: state.attempt,
                            delay,
                            reason: err.to_string(),
                        });

                        state.record(err);
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    tracing::debug!(
                        endpoint = spec.endpoint(),
                        kind = err.kind(),
                        error = %err,
                        attempts = state.attempt + 1,
                        "Request failed",
                    );
                    self.reporter.report(TelemetryEvent::RequestFailed {
                        endpoint: spec.endpoint().to_string(),
                        attempts: state.attempt + 1,
                        reason: err.to_string(),
                    });
                    return Err(err);
                }
            }
        }
    }

    /// One attempt, bounded by the request deadline.
    ///
    /// On expiry the transport future is dropped, which aborts the exchange.
    async fn attempt(&self, spec: &RequestSpec) -> RequestOutcome<HttpResponse> {
        let timeout = spec.timeout().unwrap_or(self.default_timeout);
        let request = self.build_request(spec);

        match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Err(_elapsed) => Err(RequestError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
            Ok(Err(e)) => Err(RequestError::Network(e.to_string())),
            Ok(Ok(response)) if response.is_success() => Ok(response),
            Ok(Ok(response)) => Err(RequestError::from_response(&response)),
        }
    }

    fn build_request(&self, spec: &RequestSpec) -> HttpRequest {
        let mut headers: Vec<(String, String)> = vec![("Accept".into(), "application/json".into())];
        if spec.body().is_some() {
            headers.push(("Content-Type".into(), "application/json".into()));
        }
        if let Some(token) = &self.bearer_token {
            headers.push(("Authorization".into(), format!("Bearer {token}")));
        }
        for (name, value) in spec.headers() {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }

        HttpRequest {
            method: spec.method().clone(),
            url: join_url(&self.base_url, spec.endpoint()),
            headers,
            body: spec.body().cloned(),
        }
    }
}

fn join_url(base: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    format!("{}/{}", base, endpoint.trim_start_matches('/'))
}

fn decode<T: DeserializeOwned>(endpoint: &str, response: &HttpResponse) -> RequestOutcome<T> {
    let parsed = if response.status == NO_CONTENT || response.body.is_empty() {
        serde_json::from_value(serde_json::Value::Null)
    } else {
        serde_json::from_slice(&response.body)
    };

    parsed.map_err(|e| {
        tracing::warn!(endpoint, error = %e, "Failed to decode response body");
        RequestError::Network(format!("Invalid response body from {endpoint}: {e}"))
    })
}
