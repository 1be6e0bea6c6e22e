//! Stage, commit and push through the `git` client
//!
//! Each step runs even when an earlier one failed; failures are recorded
//! with the captured stderr and drive the exit code. There is no retry and
//! no rollback. The one tolerated condition, an empty index, is detected up
//! front with `git diff --cached --quiet` and turns the commit into a
//! skipped step.

mod runner;

pub use runner::{CommandOutput, CommandRunner, SystemRunner};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::signal::CancelToken;
use crate::stamp::{self, StampOutcome};
use crate::summary::{ExitCode, ExitCodeAggregator, Status};

/// Schema identifier for deploy reports
pub const DEPLOY_REPORT_SCHEMA_ID: &str = "cellops/deploy_report@1";

const GIT: &str = "git";

/// Why a step did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NothingToCommit,
}

impl SkipReason {
    pub fn description(&self) -> &'static str {
        match self {
            SkipReason::NothingToCommit => "nothing to commit",
        }
    }
}

/// Outcome of one deploy step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub name: String,
    pub argv: Vec<String>,
    pub status: Status,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,

    /// Set when the process could not be spawned or the step failed locally
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepReport {
    fn new(name: &str, argv: Vec<String>, status: Status) -> Self {
        Self {
            name: name.to_string(),
            argv,
            status,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            skip_reason: None,
            error: None,
        }
    }

    fn from_output(name: &str, argv: Vec<String>, output: CommandOutput) -> Self {
        let status = if output.success() {
            Status::Success
        } else {
            Status::Failed
        };
        Self {
            exit_code: output.code,
            stdout: output.stdout,
            stderr: output.stderr,
            ..Self::new(name, argv, status)
        }
    }

    fn skipped(name: &str, argv: Vec<String>, reason: SkipReason) -> Self {
        Self {
            skip_reason: Some(reason),
            ..Self::new(name, argv, Status::Skipped)
        }
    }

    fn errored(name: &str, argv: Vec<String>, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(name, argv, Status::Failed)
        }
    }
}

/// What to deploy
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub message: String,
    pub remote: String,
    pub branch: String,
    /// Stamp this file before staging, using the given chrono format
    pub stamp: Option<(PathBuf, String)>,
}

/// Result of a deploy run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployReport {
    pub schema_id: String,
    pub created_at: DateTime<Utc>,
    pub remote: String,
    pub branch: String,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stamp: Option<StampOutcome>,

    pub steps: Vec<StepReport>,
}

impl DeployReport {
    pub fn exit_code(&self) -> ExitCode {
        let mut agg = ExitCodeAggregator::new();
        for step in &self.steps {
            agg.add(step.status);
        }
        agg.exit_code()
    }

    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Deploy to {}/{}: \"{}\"",
            self.remote, self.branch, self.message
        );
        for step in &self.steps {
            let command = step.argv.join(" ");
            match step.status {
                Status::Success => {
                    let _ = writeln!(out, "  ✓ {}: {}", step.name, command);
                }
                Status::Skipped => {
                    let reason = step.skip_reason.map(|r| r.description()).unwrap_or("skipped");
                    let _ = writeln!(out, "  - {}: {}", step.name, reason);
                }
                Status::Cancelled => {
                    let _ = writeln!(out, "  ✗ {}: cancelled", step.name);
                }
                Status::Failed => {
                    let detail = match (&step.error, step.exit_code) {
                        (Some(err), _) => err.clone(),
                        (None, Some(code)) => format!("exit {}", code),
                        (None, None) => "terminated by signal".to_string(),
                    };
                    let _ = writeln!(out, "  ✗ {}: {} ({})", step.name, command, detail);
                    for line in step.stderr.lines().filter(|l| !l.trim().is_empty()).take(5) {
                        let _ = writeln!(out, "      {}", line);
                    }
                }
            }
        }
        if let Some(StampOutcome::Updated { ref current, .. }) = self.stamp {
            let _ = writeln!(out, "  build date: {}", current);
        }
        out.push_str(match self.exit_code() {
            ExitCode::Success => "Deploy finished",
            ExitCode::Interrupted => "Deploy interrupted",
            _ => "Deploy finished with errors",
        });
        out
    }
}

fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Run one git invocation as a named step.
fn git_step<R: CommandRunner>(runner: &R, repo: &Path, name: &str, args: Vec<String>) -> StepReport {
    let mut full = vec![GIT.to_string()];
    full.extend(args.iter().cloned());

    log::info!("running: {}", full.join(" "));
    match runner.run(GIT, &args, repo) {
        Ok(output) => {
            let step = StepReport::from_output(name, full, output);
            if step.status == Status::Failed {
                log::error!(
                    "{} failed ({:?}): {}",
                    name,
                    step.exit_code,
                    step.stderr.trim()
                );
            }
            step
        }
        Err(e) => {
            log::error!("cannot run {}: {}", GIT, e);
            StepReport::errored(name, full, format!("failed to spawn {}: {}", GIT, e))
        }
    }
}

/// Whether the index holds no staged changes.
///
/// `git diff --cached --quiet` exits 0 for an empty index and 1 when there
/// is something to commit; anything else is unknown.
fn index_is_empty<R: CommandRunner>(runner: &R, repo: &Path) -> Option<bool> {
    match runner.run(GIT, &argv(&["diff", "--cached", "--quiet"]), repo) {
        Ok(out) => match out.code {
            Some(0) => Some(true),
            Some(1) => Some(false),
            _ => {
                log::warn!("could not inspect index: {}", out.stderr.trim());
                None
            }
        },
        Err(e) => {
            log::warn!("could not inspect index: {}", e);
            None
        }
    }
}

/// Stage everything, commit and push. Never aborts early.
pub fn deploy<R: CommandRunner>(
    runner: &R,
    repo: &Path,
    request: &DeployRequest,
    cancel: &CancelToken,
) -> DeployReport {
    let mut steps = Vec::new();
    let mut stamp_outcome = None;

    if let Some((ref file, ref format)) = request.stamp {
        let result = stamp::format_now(format).and_then(|ts| stamp::stamp_file(file, &ts));
        let step_argv = vec!["stamp".to_string(), file.display().to_string()];
        match result {
            Ok(outcome) => {
                stamp_outcome = Some(outcome);
                steps.push(StepReport::new("stamp", step_argv, Status::Success));
            }
            Err(e) => {
                log::error!("stamp failed: {}", e);
                steps.push(StepReport::errored("stamp", step_argv, e.to_string()));
            }
        }
    }

    let plan: [(&str, Vec<String>); 3] = [
        ("stage", argv(&["add", "."])),
        ("commit", vec!["commit".to_string(), "-m".to_string(), request.message.clone()]),
        ("push", vec!["push".to_string(), request.remote.clone(), request.branch.clone()]),
    ];

    for (name, args) in plan {
        if cancel.is_cancelled() {
            let mut full = vec![GIT.to_string()];
            full.extend(args);
            steps.push(StepReport::new(name, full, Status::Cancelled));
            continue;
        }

        if name == "commit" && index_is_empty(runner, repo) == Some(true) {
            log::info!("nothing to commit, skipping commit");
            let mut full = vec![GIT.to_string()];
            full.extend(args);
            steps.push(StepReport::skipped(name, full, SkipReason::NothingToCommit));
            continue;
        }

        steps.push(git_step(runner, repo, name, args));
    }

    DeployReport {
        schema_id: DEPLOY_REPORT_SCHEMA_ID.to_string(),
        created_at: Utc::now(),
        remote: request.remote.clone(),
        branch: request.branch.clone(),
        message: request.message.clone(),
        stamp: stamp_outcome,
        steps,
    }
}

#[cfg(test)]
mod tests {
    use super::runner::mock::ScriptedRunner;
    use super::*;
    use std::io;

    fn request() -> DeployRequest {
        DeployRequest {
            message: "Tune water radius".to_string(),
            remote: "origin".to_string(),
            branch: "main".to_string(),
            stamp: None,
        }
    }

    #[test]
    fn test_happy_path() {
        let runner = ScriptedRunner::new()
            .reply(0, "", "") // add
            .reply(1, "", "") // diff --cached: staged changes
            .reply(0, "[main abc123] Tune water radius", "") // commit
            .reply(0, "", "To github.com:me/life.git"); // push

        let report = deploy(&runner, Path::new("."), &request(), &CancelToken::new());

        assert_eq!(report.exit_code(), ExitCode::Success);
        assert_eq!(runner.argv(0), "git add .");
        assert_eq!(runner.argv(1), "git diff --cached --quiet");
        assert_eq!(runner.argv(2), "git commit -m Tune water radius");
        assert_eq!(runner.argv(3), "git push origin main");
        assert_eq!(report.steps.len(), 3);
        assert!(report.step("commit").unwrap().stdout.contains("abc123"));
    }

    #[test]
    fn test_nothing_to_commit_is_skipped_not_failed() {
        let runner = ScriptedRunner::new()
            .reply(0, "", "")
            .reply(0, "", "") // empty index
            .reply(0, "Everything up-to-date", "");

        let report = deploy(&runner, Path::new("."), &request(), &CancelToken::new());

        let commit = report.step("commit").unwrap();
        assert_eq!(commit.status, Status::Skipped);
        assert_eq!(commit.skip_reason, Some(SkipReason::NothingToCommit));
        assert_eq!(report.exit_code(), ExitCode::Success);
        assert_eq!(runner.calls.borrow().len(), 3);
        assert!(report.to_human().contains("- commit: nothing to commit"));
    }

    #[test]
    fn test_push_failure_is_reported_with_stderr() {
        let runner = ScriptedRunner::new()
            .reply(0, "", "")
            .reply(1, "", "")
            .reply(0, "", "")
            .reply(128, "", "fatal: 'origin' does not appear to be a git repository\n");

        let report = deploy(&runner, Path::new("."), &request(), &CancelToken::new());

        let push = report.step("push").unwrap();
        assert_eq!(push.status, Status::Failed);
        assert_eq!(push.exit_code, Some(128));
        assert_eq!(report.exit_code(), ExitCode::Failure);
        let text = report.to_human();
        assert!(text.contains("✗ push: git push origin main (exit 128)"));
        assert!(text.contains("fatal: 'origin'"));
    }

    #[test]
    fn test_failed_stage_does_not_stop_later_steps() {
        let runner = ScriptedRunner::new()
            .reply(128, "", "fatal: not a git repository")
            .reply(128, "", "fatal: not a git repository") // diff: unknown
            .reply(128, "", "fatal: not a git repository")
            .reply(128, "", "fatal: not a git repository");

        let report = deploy(&runner, Path::new("."), &request(), &CancelToken::new());

        assert_eq!(report.steps.len(), 3);
        assert!(report.steps.iter().all(|s| s.status == Status::Failed));
        assert_eq!(runner.calls.borrow().len(), 4);
    }

    #[test]
    fn test_spawn_error() {
        let runner = ScriptedRunner::new().spawn_error(io::ErrorKind::NotFound);
        let report = deploy(&runner, Path::new("."), &request(), &CancelToken::new());

        let stage = report.step("stage").unwrap();
        assert_eq!(stage.status, Status::Failed);
        assert!(stage.error.as_deref().unwrap().contains("failed to spawn git"));
    }

    #[test]
    fn test_cancelled_before_start() {
        let runner = ScriptedRunner::new();
        let token = CancelToken::new();
        token.cancel();

        let report = deploy(&runner, Path::new("."), &request(), &token);

        assert!(runner.calls.borrow().is_empty());
        assert!(report.steps.iter().all(|s| s.status == Status::Cancelled));
        assert_eq!(report.exit_code(), ExitCode::Interrupted);
    }

    #[test]
    fn test_stamp_step_runs_first() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("Version.js");
        std::fs::write(&file, "export const BUILD_DATE = '2000-01-01 00:00:00';\n").unwrap();

        let mut req = request();
        req.stamp = Some((file.clone(), "%Y-%m-%d %H:%M:%S".to_string()));
        let runner = ScriptedRunner::new();

        let report = deploy(&runner, dir.path(), &req, &CancelToken::new());

        assert_eq!(report.steps[0].name, "stamp");
        assert_eq!(report.steps[0].status, Status::Success);
        assert!(report.stamp.as_ref().unwrap().changed());
        assert!(!std::fs::read_to_string(&file).unwrap().contains("2000-01-01"));
    }

    #[test]
    fn test_stamp_failure_keeps_going() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut req = request();
        req.stamp = Some((dir.path().join("missing.js"), "%Y".to_string()));
        let runner = ScriptedRunner::new();

        let report = deploy(&runner, dir.path(), &req, &CancelToken::new());

        assert_eq!(report.steps[0].status, Status::Failed);
        assert_eq!(report.steps.len(), 4);
        assert_eq!(report.exit_code(), ExitCode::Failure);
    }
}
