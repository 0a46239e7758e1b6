//! Caller-side notifications for a polling session.

use tripkit_client::RequestError;
use tripkit_core::job::JobStatus;

use crate::error::PollError;

/// Receives a session's notifications.
///
/// Callbacks run on the session's task and hold up a concurrent
/// [`PollerSession::cancel`](crate::PollerSession::cancel) until they return,
/// so they should be quick. A callback may cancel or drop its own session;
/// no further callback follows. Nothing is delivered once `cancel` has
/// returned.
pub trait PollObserver: Send + Sync {
    /// Any change in the observed snapshot.
    fn on_status(&self, _status: &JobStatus) {}

    /// A changed snapshot in the `processing` state.
    fn on_progress(&self, _progress: u8, _current_step: Option<&str>) {}

    /// The job completed. Called at most once per session.
    fn on_complete(&self, status: &JobStatus);

    /// The job failed, or visibility was lost. Called at most once per
    /// session, and never together with `on_complete`.
    fn on_failed(&self, error: &PollError);

    /// A status fetch failed; polling continues.
    fn on_fetch_error(&self, _error: &RequestError) {}
}
