//! Classified request failures.

use tripkit_core::error_body::ErrorBody;
use tripkit_core::retry::is_retryable_status;

use crate::transport::HttpResponse;

/// Why a logical request failed. The three kinds are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// The deadline elapsed before a response arrived.
    #[error("Request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// The transport failed before producing an HTTP response, or the
    /// response body could not be decoded on the client.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {detail}")]
    Response {
        status: u16,
        detail: String,
        code: Option<String>,
        request_id: Option<String>,
    },
}

impl RequestError {
    /// Build a [`RequestError::Response`] from a non-success response.
    ///
    /// A `request_id` in the body wins over the `x-request-id` header.
    pub fn from_response(response: &HttpResponse) -> Self {
        let body = ErrorBody::parse(&response.body);
        RequestError::Response {
            status: response.status,
            detail: body.detail,
            code: body.code,
            request_id: body.request_id.or_else(|| response.request_id.clone()),
        }
    }

    /// Timeouts and network failures always; responses only for statuses
    /// on the allow-list.
    pub fn is_retryable(&self) -> bool {
        match self {
            RequestError::Timeout { .. } | RequestError::Network(_) => true,
            RequestError::Response { status, .. } => is_retryable_status(*status),
        }
    }

    /// HTTP status for [`RequestError::Response`].
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short machine-friendly kind name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::Timeout { .. } => "timeout",
            RequestError::Network(_) => "network",
            RequestError::Response { .. } => "response",
        }
    }
}
