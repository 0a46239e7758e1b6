//! Backend error response body.
//!
//! Non-success responses carry `{"detail": "...", "code": "...",
//! "request_id": "..."}`. Anything that does not parse is reported with a
//! generic detail so callers always have something to show.

use serde::{Deserialize, Serialize};

/// Detail used when the error body is missing or not valid JSON.
pub const UNEXPECTED_ERROR_DETAIL: &str = "An unexpected error occurred";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable description.
    pub detail: String,
    /// Machine-readable error code.
    #[serde(default)]
    pub code: Option<String>,
    /// Server-assigned id for cross-system correlation.
    #[serde(default)]
    pub request_id: Option<String>,
}

impl ErrorBody {
    /// Parse an error body, never failing.
    pub fn parse(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).unwrap_or_else(|_| Self::unexpected())
    }

    pub fn unexpected() -> Self {
        Self {
            detail: UNEXPECTED_ERROR_DETAIL.to_string(),
            code: None,
            request_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_body() {
        let body = br#"{"detail":"Trip not found","code":"TRIP_NOT_FOUND","request_id":"req-7"}"#;
        let parsed = ErrorBody::parse(body);
        assert_eq!(parsed.detail, "Trip not found");
        assert_eq!(parsed.code.as_deref(), Some("TRIP_NOT_FOUND"));
        assert_eq!(parsed.request_id.as_deref(), Some("req-7"));
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let parsed = ErrorBody::parse(br#"{"detail":"Rate limited"}"#);
        assert_eq!(parsed.detail, "Rate limited");
        assert!(parsed.code.is_none());
        assert!(parsed.request_id.is_none());
    }

    #[test]
    fn html_body_falls_back_to_generic_detail() {
        let parsed = ErrorBody::parse(b"<html>502 Bad Gateway</html>");
        assert_eq!(parsed, ErrorBody::unexpected());
    }

    #[test]
    fn empty_body_falls_back_to_generic_detail() {
        assert_eq!(ErrorBody::parse(b"").detail, UNEXPECTED_ERROR_DETAIL);
    }

    #[test]
    fn json_without_detail_falls_back() {
        let parsed = ErrorBody::parse(br#"{"message":"nope"}"#);
        assert_eq!(parsed.detail, UNEXPECTED_ERROR_DETAIL);
    }
}
