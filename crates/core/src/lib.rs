//! Shared domain types and policies for the tripkit request core.
//!
//! Everything here is pure: no I/O, no runtime. The HTTP executor lives in
//! `tripkit-client` and the job poller in `tripkit-poller`; both build on the
//! types and policies defined in this crate.

pub mod env;
pub mod error;
pub mod error_body;
pub mod job;
pub mod retry;
pub mod telemetry;
pub mod types;
