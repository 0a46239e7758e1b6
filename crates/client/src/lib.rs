//! Resilient HTTP client for the trip-planning backend.
//!
//! - [`RequestExecutor`]: one logical call with a per-attempt deadline,
//!   typed failure classification and jittered exponential-backoff retry.
//! - [`Transport`]: the seam between the executor and the wire;
//!   [`ReqwestTransport`] is the production implementation.
//! - [`TripReportApi`]: report job endpoints built on the executor.
//! - [`ClientConfig`]: environment-driven configuration.

pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod request;
pub mod transport;

pub use api::{StartReportResponse, TripReportApi};
pub use config::ClientConfig;
pub use error::RequestError;
pub use executor::RequestExecutor;
pub use request::RequestSpec;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};

/// Result of one logical request: data or a classified error, never both.
pub type RequestOutcome<T> = Result<T, RequestError>;
