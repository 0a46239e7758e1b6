//! Immutable description of one logical request.

use std::time::Duration;

use reqwest::Method;

/// What to call and how hard to try.
///
/// Built per call with [`RequestSpec::get`] / [`RequestSpec::post`] and the
/// `with_*` methods. A deadline or retry count left unset falls back to the
/// executor's configured default.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    endpoint: String,
    method: Method,
    body: Option<serde_json::Value>,
    headers: Vec<(String, String)>,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    retry_disabled: bool,
}

impl RequestSpec {
    /// A request with the given method against `endpoint`, a path relative
    /// to the executor's base URL (e.g. `/reports/42/status`).
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            body: None,
            headers: Vec::new(),
            timeout: None,
            max_retries: None,
            retry_disabled: false,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, endpoint).with_body(body)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a header. Headers set here override executor defaults of the
    /// same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Per-attempt deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Retries allowed after the first attempt.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Make exactly one attempt regardless of failure kind.
    pub fn without_retry(mut self) -> Self {
        self.retry_disabled = true;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    pub fn retry_disabled(&self) -> bool {
        self.retry_disabled
    }
}
