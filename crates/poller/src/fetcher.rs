//! Status-fetch seam between the poller and the backend client.

use async_trait::async_trait;
use tripkit_client::{RequestOutcome, TripReportApi};
use tripkit_core::job::JobStatus;

/// Fetches one status snapshot for a job.
///
/// Implementations are expected to do their own retrying; the poller treats
/// an error as a single failed observation.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    async fn fetch_status(&self, job_id: &str) -> RequestOutcome<JobStatus>;
}

#[async_trait]
impl StatusFetcher for TripReportApi {
    async fn fetch_status(&self, job_id: &str) -> RequestOutcome<JobStatus> {
        TripReportApi::fetch_status(self, job_id).await
    }
}
