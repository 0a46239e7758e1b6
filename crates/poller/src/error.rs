//! Terminal polling failures.

/// Why a session ended without the job completing.
///
/// Transport failures of individual status fetches never show up here on
/// their own: a flaky status channel is not a failed job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    /// The backend reported the job as `failed`.
    #[error("{0}")]
    JobFailed(String),

    /// Too many consecutive status fetches failed. Only raised when a limit
    /// is configured.
    #[error("Lost visibility of job after {failures} consecutive failed status checks")]
    LostVisibility { failures: u32 },
}
