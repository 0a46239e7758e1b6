//! Handle to a running polling session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tripkit_core::job::JobStatus;
use tripkit_core::types::JobId;

use crate::error::PollError;

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The job completed; carries the final snapshot.
    Completed(JobStatus),
    /// The job failed or visibility was lost.
    Failed(PollError),
    /// The caller cancelled (or dropped) the session first.
    Cancelled,
}

/// The session's "still active" flag.
///
/// Notifications run while `gate` is held, so [`Liveness::deactivate`]
/// returns only after any in-progress notification has finished, and none
/// starts afterwards. A notification that deactivates from its own thread
/// (an observer cancelling its session) skips the wait, since it is the
/// notification being waited on.
#[derive(Debug)]
pub(crate) struct Liveness {
    revoked: AtomicBool,
    gate: Mutex<()>,
    notifier: Mutex<Option<ThreadId>>,
}

impl Liveness {
    pub(crate) fn new() -> Self {
        Self {
            revoked: AtomicBool::new(false),
            gate: Mutex::new(()),
            notifier: Mutex::new(None),
        }
    }

    // A panicking observer poisons the locks; the guarded data stays valid.
    fn gate(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notifier(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.notifier.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn is_active(&self) -> bool {
        !self.revoked.load(Ordering::SeqCst)
    }

    /// Mark inactive. Returns whether this call made the transition.
    pub(crate) fn deactivate(&self) -> bool {
        let first = !self.revoked.swap(true, Ordering::SeqCst);
        if *self.notifier() != Some(thread::current().id()) {
            drop(self.gate());
        }
        first
    }

    /// Run `notify` only while active. `None` means the session is gone.
    pub(crate) fn notify<R>(&self, notify: impl FnOnce() -> R) -> Option<R> {
        let _gate = self.gate();
        if !self.is_active() {
            return None;
        }
        let _running = NotifierGuard::enter(self);
        Some(notify())
    }
}

/// Records the notifying thread for the duration of one notification.
struct NotifierGuard<'a> {
    liveness: &'a Liveness,
}

impl<'a> NotifierGuard<'a> {
    fn enter(liveness: &'a Liveness) -> Self {
        *liveness.notifier() = Some(thread::current().id());
        Self { liveness }
    }
}

impl Drop for NotifierGuard<'_> {
    fn drop(&mut self) {
        *self.liveness.notifier() = None;
    }
}

/// A running poll of one job.
///
/// Dropping the session cancels it, the same as calling
/// [`cancel`](Self::cancel).
pub struct PollerSession {
    job_id: JobId,
    liveness: Arc<Liveness>,
    cancel: CancellationToken,
    latest: watch::Receiver<Option<JobStatus>>,
    task: Option<JoinHandle<PollOutcome>>,
}

impl PollerSession {
    pub(crate) fn new(
        job_id: JobId,
        liveness: Arc<Liveness>,
        cancel: CancellationToken,
        latest: watch::Receiver<Option<JobStatus>>,
        task: JoinHandle<PollOutcome>,
    ) -> Self {
        Self {
            job_id,
            liveness,
            cancel,
            latest,
            task: Some(task),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Whether the session is still polling and may still notify.
    pub fn is_active(&self) -> bool {
        self.liveness.is_active()
    }

    /// Last snapshot applied by the session, if any.
    pub fn latest(&self) -> Option<JobStatus> {
        self.latest.borrow().clone()
    }

    /// Watch the last-applied snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Option<JobStatus>> {
        self.latest.clone()
    }

    /// Stop polling.
    ///
    /// Once this returns no observer callback fires for this session, even
    /// if a status fetch was in flight. Safe to call from inside an
    /// observer callback. Idempotent.
    pub fn cancel(&self) {
        if self.liveness.deactivate() {
            tracing::debug!(job_id = %self.job_id, "Polling session cancelled");
        }
        self.cancel.cancel();
    }

    /// Wait for the session to end.
    pub async fn wait(mut self) -> PollOutcome {
        let Some(task) = self.task.take() else {
            return PollOutcome::Cancelled;
        };
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(job_id = %self.job_id, error = %e, "Polling task aborted");
                PollOutcome::Cancelled
            }
        }
    }
}

impl Drop for PollerSession {
    fn drop(&mut self) {
        self.cancel();
    }
}
