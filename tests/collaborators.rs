//! Deploy and smoke through the pipeline with in-test collaborators.

mod fixtures;

use cellops::deploy::{CommandOutput, CommandRunner};
use cellops::pipeline::{run_deploy, run_smoke, Context};
use cellops::smoke::{Driver, DriverError, ENGINE_PRESENT, GET_STATS, RESET, SEED_COLOR};
use cellops::{CancelToken, ExitCode, Status};
use fixtures::healthy_project;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Answers `git diff --cached --quiet` with `diff_code`, everything else with 0.
struct RecordingGit {
    diff_code: i32,
    push_code: i32,
    calls: RefCell<Vec<(String, PathBuf)>>,
}

impl RecordingGit {
    fn new(diff_code: i32, push_code: i32) -> Self {
        Self {
            diff_code,
            push_code,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl CommandRunner for RecordingGit {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> io::Result<CommandOutput> {
        let line = format!("{} {}", program, args.join(" "));
        self.calls.borrow_mut().push((line, cwd.to_path_buf()));
        let code = match args.first().map(String::as_str) {
            Some("diff") => self.diff_code,
            Some("push") => self.push_code,
            _ => 0,
        };
        Ok(CommandOutput {
            code: Some(code),
            stdout: String::new(),
            stderr: if code == 0 {
                String::new()
            } else {
                "error: failed to push some refs".to_string()
            },
        })
    }
}

#[test]
fn test_deploy_uses_configured_remote_and_base_dir() {
    let project = healthy_project();
    fs::write(
        project.path().join("cellops.toml"),
        "[deploy]\nremote = \"upstream\"\nbranch = \"gh-pages\"\n",
    )
    .unwrap();
    let ctx = Context::load(Some(project.path()), None, json!({})).unwrap();
    let git = RecordingGit::new(1, 0);

    let report = run_deploy(&ctx, &git, None, false, &CancelToken::new());

    let calls = git.calls.borrow();
    let lines: Vec<_> = calls.iter().map(|(l, _)| l.as_str()).collect();
    assert_eq!(
        lines,
        vec![
            "git add .",
            "git diff --cached --quiet",
            "git commit -m Auto-update",
            "git push upstream gh-pages",
        ]
    );
    assert!(calls.iter().all(|(_, cwd)| cwd == project.path()));
    assert_eq!(report.exit_code(), ExitCode::Success);
}

#[test]
fn test_deploy_with_stamp_and_failed_push() {
    let project = healthy_project();
    let ctx = Context::load(Some(project.path()), None, json!({})).unwrap();
    let git = RecordingGit::new(1, 1);

    let report = run_deploy(
        &ctx,
        &git,
        Some("Faster water".to_string()),
        true,
        &CancelToken::new(),
    );

    assert_eq!(report.message, "Faster water");
    assert_eq!(report.steps[0].name, "stamp");
    assert!(report.stamp.as_ref().unwrap().changed());
    assert_eq!(report.step("push").unwrap().status, Status::Failed);
    assert_eq!(report.exit_code(), ExitCode::Failure);

    let value: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(value["schema_id"], "cellops/deploy_report@1");
    assert_eq!(value["stamp"]["status"], "updated");
}

#[test]
fn test_deploy_nothing_to_commit() {
    let project = healthy_project();
    let ctx = Context::load(Some(project.path()), None, json!({})).unwrap();
    let git = RecordingGit::new(0, 0);

    let report = run_deploy(&ctx, &git, Some(String::new()), false, &CancelToken::new());

    assert_eq!(report.message, "Auto-update");
    assert_eq!(report.step("commit").unwrap().status, Status::Skipped);
    assert_eq!(report.exit_code(), ExitCode::Success);
}

/// A page that is already past every threshold.
struct SettledPage {
    log: Vec<String>,
}

impl Driver for SettledPage {
    fn goto(&mut self, url: &str) -> Result<(), DriverError> {
        self.log.push(format!("goto {}", url));
        Ok(())
    }

    fn evaluate(&mut self, expression: &str) -> Result<Value, DriverError> {
        self.log.push(format!("eval {}", expression));
        Ok(match expression {
            ENGINE_PRESENT => json!(true),
            GET_STATS => json!({
                "plantCount": 12, "seedCount": 4, "waterCells": 310, "tickCount": 2400
            }),
            RESET => Value::Null,
            SEED_COLOR => json!("#ffff00"),
            _ => Value::Null,
        })
    }

    fn click(&mut self, selector: &str) -> Result<(), DriverError> {
        self.log.push(format!("click {}", selector));
        Ok(())
    }

    fn screenshot(&mut self, path: &Path) -> Result<(), DriverError> {
        self.log.push(format!("screenshot {}", path.display()));
        Ok(())
    }

    fn drain_console(&mut self) -> Result<Vec<String>, DriverError> {
        Ok(Vec::new())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.log.push("close".to_string());
        Ok(())
    }
}

#[test]
fn test_smoke_through_pipeline() {
    let project = healthy_project();
    let ctx = Context::load(
        Some(project.path()),
        None,
        json!({ "smoke": { "url": "http://127.0.0.1:9000/", "screenshot_dir": "shots" } }),
    )
    .unwrap();
    let mut page = SettledPage { log: Vec::new() };

    let report = run_smoke(&ctx, &mut page, &CancelToken::new()).unwrap();

    assert!(report.passed, "{}", report.to_human());
    assert_eq!(report.exit_code(), ExitCode::Success);
    assert_eq!(page.log.first().unwrap(), "goto http://127.0.0.1:9000/");
    assert_eq!(page.log.last().unwrap(), "close");
    assert!(page
        .log
        .iter()
        .any(|l| l == &format!("screenshot {}", project.path().join("shots/test_final.png").display())));
    assert_eq!(report.results.len(), 5);
}
