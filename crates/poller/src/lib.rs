//! Status poller for long-running report jobs.
//!
//! [`JobStatusPoller::start`] spawns a [`PollerSession`] that fetches a job's
//! status on a fixed interval, reports changes to a [`PollObserver`], and
//! stops on the job's terminal state or on cancellation.

pub mod error;
pub mod fetcher;
pub mod observer;
pub mod poller;
pub mod session;

pub use error::PollError;
pub use fetcher::StatusFetcher;
pub use observer::PollObserver;
pub use poller::{JobStatusPoller, PollerConfig};
pub use session::{PollOutcome, PollerSession};
