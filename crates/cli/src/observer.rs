//! Observer that logs session notifications.

use std::sync::atomic::{AtomicU8, Ordering};

use tripkit_client::RequestError;
use tripkit_core::job::JobStatus;
use tripkit_poller::{PollError, PollObserver};

/// Logs every notification through `tracing`.
#[derive(Debug, Default)]
pub struct LogObserver {
    last_progress: AtomicU8,
}

impl LogObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest progress reported so far.
    pub fn last_progress(&self) -> u8 {
        self.last_progress.load(Ordering::Relaxed)
    }
}

impl PollObserver for LogObserver {
    fn on_status(&self, status: &JobStatus) {
        tracing::debug!(
            state = %status.state,
            completed_steps = ?status.completed_steps,
            failed_steps = ?status.failed_steps,
            "Job status changed",
        );
    }

    fn on_progress(&self, progress: u8, current_step: Option<&str>) {
        self.last_progress.fetch_max(progress, Ordering::Relaxed);
        tracing::info!(
            progress,
            current_step = current_step.unwrap_or("-"),
            "Generating report",
        );
    }

    fn on_complete(&self, status: &JobStatus) {
        self.last_progress.store(status.progress_percent(), Ordering::Relaxed);
        tracing::info!(completed_at = ?status.completed_at, "Report ready");
    }

    fn on_failed(&self, error: &PollError) {
        tracing::error!(error = %error, "Report generation failed");
    }

    fn on_fetch_error(&self, error: &RequestError) {
        tracing::warn!(error = %error, "Could not check report status");
    }
}
