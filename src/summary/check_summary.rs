//! Report envelope for `cellops check`

use cellops_checker::{ArtifactReport, RunReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use super::exit::ExitCode;

/// Schema version for check reports
pub const CHECK_REPORT_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for check reports
pub const CHECK_REPORT_SCHEMA_ID: &str = "cellops/check_report@1";

/// One check set's results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetReport {
    pub name: String,
    pub title: String,
    pub report: RunReport,
}

/// Results of every check set run by one invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSummary {
    pub schema_version: u32,
    pub schema_id: String,
    pub created_at: DateTime<Utc>,

    /// Digest of the config file the check sets came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_digest: Option<String>,

    pub passed: bool,
    pub check_count: usize,
    pub failed_count: usize,
    pub load_error_count: usize,
    pub duration_ms: u64,
    pub sets: Vec<SetReport>,
}

impl CheckSummary {
    pub fn new(config_digest: Option<String>) -> Self {
        Self {
            schema_version: CHECK_REPORT_SCHEMA_VERSION,
            schema_id: CHECK_REPORT_SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config_digest,
            passed: true,
            check_count: 0,
            failed_count: 0,
            load_error_count: 0,
            duration_ms: 0,
            sets: Vec::new(),
        }
    }

    pub fn add_set(&mut self, name: String, title: String, report: RunReport) {
        self.check_count += report.check_count();
        self.failed_count += report.failed_count();
        self.load_error_count += report.load_error_count();
        self.passed &= report.passed;
        self.sets.push(SetReport {
            name,
            title,
            report,
        });
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from_passed(self.passed)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Console rendering: one line per check, a verdict per set and overall.
    pub fn to_human(&self) -> String {
        let mut out = String::new();

        for set in &self.sets {
            let _ = writeln!(out, "== {} ==", set.title);
            for artifact in &set.report.artifacts {
                render_artifact(&mut out, artifact);
            }
            let _ = writeln!(
                out,
                "{}: {}/{} checks passed",
                if set.report.passed { "PASS" } else { "FAIL" },
                set.report.passed_count(),
                set.report.check_count()
            );
            out.push('\n');
        }

        if self.sets.is_empty() {
            out.push_str("No check sets configured.\n");
        }

        let _ = write!(
            out,
            "Overall: {} ({} checks, {} failed",
            if self.passed { "PASS" } else { "FAIL" },
            self.check_count,
            self.failed_count
        );
        if self.load_error_count > 0 {
            let _ = write!(out, ", {} unreadable artifact(s)", self.load_error_count);
        }
        out.push(')');
        out
    }
}

fn render_artifact(out: &mut String, artifact: &ArtifactReport) {
    let _ = writeln!(out, "{}", artifact.path.display());
    if let Some(ref err) = artifact.load_error {
        let _ = writeln!(out, "  ✗ cannot read artifact: {}", err);
    }
    for result in &artifact.results {
        let mark = if result.passed { "✓" } else { "✗" };
        let _ = writeln!(out, "  {} {}", mark, result.name);
    }
}
