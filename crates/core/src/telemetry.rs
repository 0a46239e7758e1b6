//! Reporting hook for request and polling diagnostics.
//!
//! The executor and the poller take an `Arc<dyn Reporter>` at construction.
//! Reporting never influences control flow.

use std::time::Duration;

/// A diagnostic event emitted by the request core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    /// A failed attempt is about to be retried after `delay`.
    RequestRetried {
        endpoint: String,
        attempt: u32,
        delay: Duration,
        reason: String,
    },

    /// A request failed for good (non-retryable or retries exhausted).
    RequestFailed {
        endpoint: String,
        attempts: u32,
        reason: String,
    },

    /// A status fetch failed; the poller keeps going.
    StatusFetchFailed {
        job_id: String,
        consecutive_failures: u32,
        reason: String,
    },

    /// A polled job reached a terminal state.
    JobFinished { job_id: String, succeeded: bool },
}

/// Receives [`TelemetryEvent`]s.
pub trait Reporter: Send + Sync {
    fn report(&self, event: TelemetryEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn report(&self, _event: TelemetryEvent) {}
}

/// Re-emits events as `debug` tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: TelemetryEvent) {
        tracing::debug!(?event, "telemetry");
    }
}
