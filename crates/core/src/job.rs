//! Report job status document as exposed by the backend.
//!
//! The backend runs report generation as a multi-step pipeline ("agents").
//! Clients only ever read [`JobStatus`] snapshots; they never mutate job
//! state.

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{parse_timestamp, Timestamp};

/// Message used when a job reports `failed` without an error string.
pub const GENERIC_JOB_FAILURE: &str = "Trip report generation failed";

/// Upper bound of the progress percentage.
pub const MAX_PROGRESS: u8 = 100;

/// Lifecycle state of a report job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Draft,
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    /// `completed` and `failed` never transition further.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Wire name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Draft => "draft",
            JobState::Queued => "queued",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point-in-time snapshot of a report job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    /// Overall lifecycle state.
    #[serde(rename = "status")]
    pub state: JobState,

    /// Composite progress, nominally `0..=100`.
    #[serde(default)]
    pub progress: u8,

    /// Step currently executing, if any.
    #[serde(rename = "current_agent", default)]
    pub current_step: Option<String>,

    /// Steps that have finished successfully, in completion order.
    #[serde(rename = "agents_completed", default)]
    pub completed_steps: Vec<String>,

    /// Steps that have failed.
    #[serde(rename = "agents_failed", default)]
    pub failed_steps: Vec<String>,

    /// Human-readable error, set when the job failed.
    #[serde(default)]
    pub error: Option<String>,

    /// Unparseable timestamps read as `None` rather than failing the
    /// whole snapshot.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub started_at: Option<Timestamp>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub completed_at: Option<Timestamp>,
}

impl JobStatus {
    /// A bare snapshot in the given state with everything else empty.
    pub fn new(state: JobState) -> Self {
        Self {
            state,
            progress: 0,
            current_step: None,
            completed_steps: Vec::new(),
            failed_steps: Vec::new(),
            error: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_current_step(mut self, step: impl Into<String>) -> Self {
        self.current_step = Some(step.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Progress clamped to `0..=100`.
    pub fn progress_percent(&self) -> u8 {
        self.progress.min(MAX_PROGRESS)
    }

    /// The job's own error message, or [`GENERIC_JOB_FAILURE`] when absent
    /// or blank.
    pub fn failure_message(&self) -> &str {
        self.error
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(GENERIC_JOB_FAILURE)
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(parse_timestamp))
}
