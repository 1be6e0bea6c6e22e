//! Report envelopes and the exit-code contract

mod check_summary;
mod exit;

pub use check_summary::{CheckSummary, SetReport, CHECK_REPORT_SCHEMA_ID, CHECK_REPORT_SCHEMA_VERSION};
pub use exit::{ExitCode, ExitCodeAggregator, Status};
