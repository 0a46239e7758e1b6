//! Command-line argument parsing.

use std::path::PathBuf;

pub const USAGE: &str = "usage: trip-report start <payload.json> | trip-report watch <job-id>";

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a report job from a JSON payload file, then watch it.
    Start { payload: PathBuf },
    /// Watch an existing job.
    Watch { job_id: String },
}

impl Command {
    /// Parse arguments (excluding the program name).
    pub fn parse<I, S>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        match args.as_slice() {
            [cmd, path] if cmd == "start" => Ok(Command::Start {
                payload: PathBuf::from(path),
            }),
            [cmd, job_id] if cmd == "watch" && !job_id.trim().is_empty() => Ok(Command::Watch {
                job_id: job_id.trim().to_string(),
            }),
            _ => Err(USAGE.to_string()),
        }
    }
}
