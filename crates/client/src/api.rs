//! Report job endpoints on the trip-planning backend.
//!
//! Wraps job creation, status retrieval and report retrieval on top of a
//! shared [`RequestExecutor`].

use std::sync::Arc;

use serde::Deserialize;
use tripkit_core::job::JobStatus;
use tripkit_core::types::JobId;

use crate::executor::RequestExecutor;
use crate::request::RequestSpec;
use crate::RequestOutcome;

/// Job creation endpoint.
pub const START_REPORT_PATH: &str = "/reports/generate";

/// Response returned by the job creation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StartReportResponse {
    /// Identifier for subsequent status fetches.
    #[serde(alias = "id")]
    pub job_id: JobId,
}

/// Client for the report job endpoints.
#[derive(Clone)]
pub struct TripReportApi {
    executor: Arc<RequestExecutor>,
}

impl TripReportApi {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    /// Start report generation with a job-specific payload.
    ///
    /// Sends `POST /reports/generate` with retries disabled: a timed-out
    /// attempt may still have created the job, and retrying would start a
    /// second one.
    pub async fn start_report(
        &self,
        payload: &serde_json::Value,
    ) -> RequestOutcome<StartReportResponse> {
        let spec = RequestSpec::post(START_REPORT_PATH, payload.clone()).without_retry();
        let response: StartReportResponse = self.executor.execute(&spec).await?;

        tracing::info!(job_id = %response.job_id, "Report job started");
        Ok(response)
    }

    /// Fetch the current status document of a job.
    ///
    /// Sends `GET /reports/{job_id}/status` with the executor's default
    /// retry policy.
    pub async fn fetch_status(&self, job_id: &str) -> RequestOutcome<JobStatus> {
        self.executor
            .execute(&RequestSpec::get(status_path(job_id)))
            .await
    }

    /// Fetch the finished report document of a job.
    ///
    /// Sends `GET /reports/{job_id}`. The report body is opaque to this
    /// crate.
    pub async fn fetch_report(&self, job_id: &str) -> RequestOutcome<serde_json::Value> {
        self.executor
            .execute(&RequestSpec::get(report_path(job_id)))
            .await
    }
}

/// `GET` path of a job's status document.
pub fn status_path(job_id: &str) -> String {
    encoded_path(&["reports", job_id, "status"])
}

/// `GET` path of a job's finished report.
pub fn report_path(job_id: &str) -> String {
    encoded_path(&["reports", job_id])
}

/// Join path segments, percent-encoding each one so an id containing `/`,
/// `?` or `#` stays a single segment.
fn encoded_path(segments: &[&str]) -> String {
    reqwest::Url::parse(PATH_BASE)
        .ok()
        .and_then(|mut url| {
            url.path_segments_mut().ok()?.clear().extend(segments);
            Some(url.path().to_owned())
        })
        .unwrap_or_else(|| format!("/{}", segments.join("/")))
}

const PATH_BASE: &str = "http://localhost/";
