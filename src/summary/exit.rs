//! Stable exit codes and step status

use serde::{Deserialize, Serialize};

/// Outcome of one discrete operation (a check set, a deploy step, a smoke check)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failed,
    /// Not run because its precondition did not hold (e.g. nothing to commit)
    Skipped,
    Cancelled,
}

/// Process exit codes. These are the external contract of the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ExitCode {
    /// Everything passed
    #[default]
    Success = 0,
    /// At least one check, artifact load or collaborator step failed
    Failure = 1,
    /// Configuration or usage error; nothing was run
    Config = 2,
    /// Interrupted by SIGINT/SIGTERM
    Interrupted = 130,
}

impl ExitCode {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn from_passed(passed: bool) -> Self {
        if passed {
            ExitCode::Success
        } else {
            ExitCode::Failure
        }
    }
}

/// Folds statuses into one exit code: cancellation wins over failure,
/// failure over success; skipped steps do not fail a run.
#[derive(Debug, Default)]
pub struct ExitCodeAggregator {
    failed: bool,
    cancelled: bool,
}

impl ExitCodeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, status: Status) {
        match status {
            Status::Failed => self.failed = true,
            Status::Cancelled => self.cancelled = true,
            Status::Success | Status::Skipped => {}
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.cancelled {
            ExitCode::Interrupted
        } else if self.failed {
            ExitCode::Failure
        } else {
            ExitCode::Success
        }
    }
}
