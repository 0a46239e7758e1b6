//! `trip-report` -- start or watch a trip report job.
//!
//! Progress is logged to stderr. On completion the report document is
//! printed to stdout as JSON; a failed job exits non-zero. Ctrl-C cancels
//! the polling session.
//!
//! # Environment variables
//!
//! See [`ClientConfig::from_env`] and [`PollerConfig::from_env`]. `RUST_LOG`
//! overrides the default log filter.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tripkit_cli::command::Command;
use tripkit_cli::observer::LogObserver;
use tripkit_client::{ClientConfig, ReqwestTransport, RequestExecutor, TripReportApi};
use tripkit_core::telemetry::TracingReporter;
use tripkit_poller::{JobStatusPoller, PollOutcome, PollerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tripkit_cli=info,tripkit_client=info,tripkit_poller=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = Command::parse(std::env::args().skip(1)).map_err(anyhow::Error::msg)?;

    let client_config = ClientConfig::from_env().context("invalid client configuration")?;
    let poller_config = PollerConfig::from_env().context("invalid poller configuration")?;

    let reporter = Arc::new(TracingReporter);
    let executor = RequestExecutor::from_config(Arc::new(ReqwestTransport::new()), &client_config)
        .with_reporter(reporter.clone());
    let api = TripReportApi::new(Arc::new(executor));

    let job_id = match command {
        Command::Start { payload } => {
            let raw = std::fs::read_to_string(&payload)
                .with_context(|| format!("reading {}", payload.display()))?;
            let payload: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", payload.display()))?;
            api.start_report(&payload).await?.job_id
        }
        Command::Watch { job_id } => job_id,
    };

    let poller = JobStatusPoller::new(Arc::new(api.clone()))
        .with_config(poller_config)
        .with_reporter(reporter);
    let session = poller.start(job_id.clone(), Arc::new(LogObserver::new()));

    let outcome = tokio::select! {
        outcome = session.wait() => outcome,
        _ = tokio::signal::ctrl_c() => {
            // The session was moved into `wait`; dropping that future drops
            // the session, which cancels it.
            tracing::info!(job_id = %job_id, "Interrupted, polling cancelled");
            PollOutcome::Cancelled
        }
    };

    match outcome {
        PollOutcome::Completed(_) => {
            let report = api.fetch_report(&job_id).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        PollOutcome::Failed(error) => anyhow::bail!("job {job_id}: {error}"),
        PollOutcome::Cancelled => anyhow::bail!("job {job_id}: polling cancelled"),
    }
}
