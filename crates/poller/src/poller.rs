//! Interval-driven status polling for report jobs.
//!
//! Each session is one spawned task that owns its ticker. The first fetch
//! happens immediately; later fetches follow the ticker. Fetches can overlap
//! when the status channel is slow, so each one is tagged with a sequence
//! number and a result older than the newest applied snapshot is discarded.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tripkit_client::{RequestError, RequestOutcome};
use tripkit_core::env;
use tripkit_core::error::CoreError;
use tripkit_core::job::{JobState, JobStatus};
use tripkit_core::telemetry::{NoopReporter, Reporter, TelemetryEvent};
use tripkit_core::types::JobId;

use crate::error::PollError;
use crate::fetcher::StatusFetcher;
use crate::observer::PollObserver;
use crate::session::{Liveness, PollOutcome, PollerSession};

/// Default delay between status fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Default bound on concurrently outstanding status fetches.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Shortest interval a session will tick at.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polling parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Delay between ticks.
    pub interval: Duration,
    /// Ticks are skipped while this many fetches are outstanding.
    pub max_in_flight: usize,
    /// Consecutive failed fetches that end the session with
    /// [`PollError::LostVisibility`]. `None` polls indefinitely.
    pub max_consecutive_failures: Option<u32>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            max_consecutive_failures: None,
        }
    }
}

impl PollerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default |
    /// |----------------------------------|---------|
    /// | `POLL_INTERVAL_MS`               | `3000`  |
    /// | `POLL_MAX_IN_FLIGHT`             | `4`     |
    /// | `POLL_MAX_CONSECUTIVE_FAILURES`  | unset   |
    pub fn from_env() -> Result<Self, CoreError> {
        let interval_ms =
            env::parse_or("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL.as_millis() as u64)?;
        if interval_ms == 0 {
            return Err(CoreError::Validation(
                "POLL_INTERVAL_MS must be greater than zero".into(),
            ));
        }
        let max_in_flight = env::parse_or("POLL_MAX_IN_FLIGHT", DEFAULT_MAX_IN_FLIGHT)?.max(1);

        Ok(Self {
            interval: Duration::from_millis(interval_ms),
            max_in_flight,
            max_consecutive_failures: env::parse_optional("POLL_MAX_CONSECUTIVE_FAILURES")?,
        })
    }

    /// Raise a zero interval to [`MIN_POLL_INTERVAL`] and a zero in-flight
    /// bound to one, so a session always ticks and always fetches.
    pub fn normalized(self) -> Self {
        Self {
            interval: self.interval.max(MIN_POLL_INTERVAL),
            max_in_flight: self.max_in_flight.max(1),
            ..self
        }
    }
}

/// Starts polling sessions against a [`StatusFetcher`].
pub struct JobStatusPoller {
    fetcher: Arc<dyn StatusFetcher>,
    config: PollerConfig,
    reporter: Arc<dyn Reporter>,
}

impl JobStatusPoller {
    pub fn new(fetcher: Arc<dyn StatusFetcher>) -> Self {
        Self {
            fetcher,
            config: PollerConfig::default(),
            reporter: Arc::new(NoopReporter),
        }
    }

    pub fn with_config(mut self, config: PollerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Spawn a session polling `job_id` and notifying `observer`.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(
        &self,
        job_id: impl Into<JobId>,
        observer: Arc<dyn PollObserver>,
    ) -> PollerSession {
        let job_id = job_id.into();
        let config = self.config.clone().normalized();
        let liveness = Arc::new(Liveness::new());
        let cancel = CancellationToken::new();
        let (latest_tx, latest_rx) = watch::channel(None);

        let run = SessionRun {
            job_id: job_id.clone(),
            fetcher: Arc::clone(&self.fetcher),
            observer,
            reporter: Arc::clone(&self.reporter),
            config,
            liveness: Arc::clone(&liveness),
            latest: latest_tx,
            last_status: None,
            last_applied_seq: 0,
            consecutive_failures: 0,
        };

        tracing::info!(
            job_id = %job_id,
            interval_ms = run.config.interval.as_millis() as u64,
            "Polling session started",
        );

        let task = tokio::spawn(run.run(cancel.clone()));
        PollerSession::new(job_id, liveness, cancel, latest_rx, task)
    }
}

/// State owned by a session's task.
struct SessionRun {
    job_id: JobId,
    fetcher: Arc<dyn StatusFetcher>,
    observer: Arc<dyn PollObserver>,
    reporter: Arc<dyn Reporter>,
    config: PollerConfig,
    liveness: Arc<Liveness>,
    latest: watch::Sender<Option<JobStatus>>,
    last_status: Option<JobStatus>,
    last_applied_seq: u64,
    consecutive_failures: u32,
}

/// An outstanding status fetch, tagged with its sequence number.
type PendingFetch = BoxFuture<'static, (u64, RequestOutcome<JobStatus>)>;

/// What the loop should do after handling a fetch result.
enum Step {
    Continue,
    Finish(PollOutcome),
}

impl SessionRun {
    async fn run(mut self, cancel: CancellationToken) -> PollOutcome {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight: FuturesUnordered<PendingFetch> = FuturesUnordered::new();
        let mut next_seq: u64 = 0;

        let outcome = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break PollOutcome::Cancelled,

                Some((seq, result)) = in_flight.next(), if !in_flight.is_empty() => {
                    if let Step::Finish(outcome) = self.handle_result(seq, result) {
                        break outcome;
                    }
                }

                _ = ticker.tick() => {
                    if self.last_status.as_ref().is_some_and(JobStatus::is_terminal) {
                        continue;
                    }
                    if in_flight.len() >= self.config.max_in_flight {
                        tracing::debug!(
                            job_id = %self.job_id,
                            in_flight = in_flight.len(),
                            "Skipping status check, too many outstanding",
                        );
                        continue;
                    }
                    next_seq += 1;
                    in_flight.push(fetch(Arc::clone(&self.fetcher), self.job_id.clone(), next_seq).boxed());
                }
            }
        };

        // Dropping `in_flight` aborts any outstanding fetch.
        drop(in_flight);
        self.liveness.deactivate();
        tracing::info!(
            job_id = %self.job_id,
            outcome = outcome_name(&outcome),
            "Polling session ended",
        );
        outcome
    }

    fn handle_result(&mut self, seq: u64, result: RequestOutcome<JobStatus>) -> Step {
        if seq <= self.last_applied_seq {
            tracing::debug!(
                job_id = %self.job_id,
                seq,
                last_applied_seq = self.last_applied_seq,
                "Discarding out-of-order status result",
            );
            return Step::Continue;
        }

        match result {
            Ok(status) => {
                self.last_applied_seq = seq;
                self.consecutive_failures = 0;
                self.apply_status(status)
            }
            Err(err) => self.record_fetch_failure(err),
        }
    }

    fn apply_status(&mut self, status: JobStatus) -> Step {
        if self.last_status.as_ref() == Some(&status) {
            return Step::Continue;
        }
        self.last_status = Some(status.clone());
        self.latest.send_replace(Some(status.clone()));

        tracing::debug!(
            job_id = %self.job_id,
            state = %status.state,
            progress = status.progress,
            current_step = ?status.current_step,
            "Job status changed",
        );

        if self.notify(|o| o.on_status(&status)).is_none() {
            return Step::Finish(PollOutcome::Cancelled);
        }
        let notified = match status.state {
            JobState::Draft | JobState::Queued => Some(Step::Continue),
            JobState::Processing => self.notify(|o| {
                o.on_progress(status.progress_percent(), status.current_step.as_deref());
                Step::Continue
            }),
            JobState::Completed => self.notify(|o| {
                o.on_complete(&status);
                Step::Finish(PollOutcome::Completed(status.clone()))
            }),
            JobState::Failed => {
                let error = PollError::JobFailed(status.failure_message().to_string());
                self.notify(|o| {
                    o.on_failed(&error);
                    Step::Finish(PollOutcome::Failed(error.clone()))
                })
            }
        };

        let Some(step) = notified else {
            return Step::Finish(PollOutcome::Cancelled);
        };
        if status.is_terminal() {
            self.reporter.report(TelemetryEvent::JobFinished {
                job_id: self.job_id.clone(),
                succeeded: status.state == JobState::Completed,
            });
        }
        step
    }

    fn record_fetch_failure(&mut self, err: RequestError) -> Step {
        self.consecutive_failures += 1;

        tracing::warn!(
            job_id = %self.job_id,
            error = %err,
            consecutive_failures = self.consecutive_failures,
            "Status check failed, will retry on next tick",
        );
        self.reporter.report(TelemetryEvent::StatusFetchFailed {
            job_id: self.job_id.clone(),
            consecutive_failures: self.consecutive_failures,
            reason: err.to_string(),
        });

        let limit_reached = self
            .config
            .max_consecutive_failures
            .is_some_and(|limit| self.consecutive_failures >= limit);

        if self.notify(|o| o.on_fetch_error(&err)).is_none() {
            return Step::Finish(PollOutcome::Cancelled);
        }
        if !limit_reached {
            return Step::Continue;
        }

        let error = PollError::LostVisibility {
            failures: self.consecutive_failures,
        };
        self.notify(|o| {
            o.on_failed(&error);
            Step::Finish(PollOutcome::Failed(error.clone()))
        })
        .unwrap_or(Step::Finish(PollOutcome::Cancelled))
    }

    /// Run one observer callback unless the session has been cancelled,
    /// possibly by the previous callback.
    fn notify<R>(&self, f: impl FnOnce(&dyn PollObserver) -> R) -> Option<R> {
        self.liveness.notify(|| f(self.observer.as_ref()))
    }
}

async fn fetch(
    fetcher: Arc<dyn StatusFetcher>,
    job_id: JobId,
    seq: u64,
) -> (u64, RequestOutcome<JobStatus>) {
    (seq, fetcher.fetch_status(&job_id).await)
}

fn outcome_name(outcome: &PollOutcome) -> &'static str {
    match outcome {
        PollOutcome::Completed(_) => "completed",
        PollOutcome::Failed(_) => "failed",
        PollOutcome::Cancelled => "cancelled",
    }
}
