//! The end-to-end smoke scenario against a running simulation page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use cellops_checker::CheckResult;

use super::driver::{Driver, DriverError};
use crate::config::SmokeConfig;
use crate::signal::CancelToken;
use crate::summary::ExitCode;
use crate::timeout::{poll_until, PollConfig, PollOutcome};

/// Schema identifier for smoke reports
pub const SMOKE_REPORT_SCHEMA_ID: &str = "cellops/smoke_report@1";

pub const ENGINE_PRESENT: &str = "typeof window.simulationEngine !== 'undefined'";
pub const GET_STATS: &str = "window.simulationEngine.getStats()";
pub const RESET: &str = "window.simulationEngine.reset()";
pub const SEED_COLOR: &str =
    "(() => window.simulationEngine?.renderer?.colors?.seed || 'not found')()";

pub const CHECK_WATER: &str = "water generated";
pub const CHECK_PLANTS: &str = "plants created";
pub const CHECK_ADVANCING: &str = "simulation advancing";
pub const CHECK_SEEDS: &str = "seeds generated";
pub const CHECK_SEED_COLOR: &str = "seed colour";

/// Statistics returned by `getStats()`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimStats {
    pub plant_count: u64,
    pub seed_count: u64,
    pub water_cells: u64,
    pub tick_count: u64,
}

/// Resolved scenario parameters
#[derive(Debug, Clone)]
pub struct SmokeOptions {
    pub url: String,
    pub screenshot_dir: PathBuf,
    pub start_selector: String,
    pub pause_selector: String,
    pub tick_threshold: u64,
    pub run_poll: PollConfig,
    pub seed_poll: PollConfig,
    pub expected_seed_color: String,
    pub seed_messages: Vec<String>,
}

impl SmokeOptions {
    /// Build options from config; a relative screenshot dir resolves
    /// against `base_dir`.
    pub fn from_config(config: &SmokeConfig, base_dir: &Path) -> Self {
        let screenshot_dir = if config.screenshot_dir.is_absolute() {
            config.screenshot_dir.clone()
        } else {
            base_dir.join(&config.screenshot_dir)
        };
        Self {
            url: config.url.clone(),
            screenshot_dir,
            start_selector: config.start_selector.clone(),
            pause_selector: config.pause_selector.clone(),
            tick_threshold: config.tick_threshold,
            run_poll: PollConfig::from_millis_and_secs(
                config.poll_interval_ms,
                config.run_timeout_seconds,
            ),
            seed_poll: PollConfig::from_millis_and_secs(
                config.poll_interval_ms,
                config.seed_timeout_seconds,
            ),
            expected_seed_color: config.expected_seed_color.clone(),
            seed_messages: config.seed_messages.clone(),
        }
    }

    fn is_seed_message(&self, text: &str) -> bool {
        self.seed_messages.iter().any(|m| text.contains(m.as_str()))
    }

    /// Move seed messages from the driver's console into `seen`.
    fn collect_seed_messages<D: Driver>(
        &self,
        driver: &mut D,
        seen: &mut Vec<String>,
    ) -> Result<(), DriverError> {
        for msg in driver.drain_console()? {
            if self.is_seed_message(&msg) {
                log::info!("console: {}", msg);
                seen.push(msg);
            }
        }
        Ok(())
    }
}

/// Result of a smoke run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeReport {
    pub schema_id: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub passed: bool,
    pub cancelled: bool,

    /// Why the scenario stopped early, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial: Option<SimStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_run: Option<SimStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_seeds: Option<SimStats>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub seed_messages: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_color: Option<String>,

    pub screenshots: Vec<PathBuf>,
    pub results: Vec<CheckResult>,
}

impl SmokeReport {
    fn new(url: &str) -> Self {
        Self {
            schema_id: SMOKE_REPORT_SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            url: url.to_string(),
            passed: false,
            cancelled: false,
            aborted: None,
            initial: None,
            after_run: None,
            after_seeds: None,
            seed_messages: Vec::new(),
            seed_color: None,
            screenshots: Vec::new(),
            results: Vec::new(),
        }
    }

    fn record(&mut self, name: &str, passed: bool) {
        if passed {
            log::info!("smoke check passed: {}", name);
            self.results.push(CheckResult::pass(name));
        } else {
            log::warn!("smoke check failed: {}", name);
            self.results.push(CheckResult::fail(name));
        }
    }

    fn finish(mut self) -> Self {
        self.passed = !self.cancelled
            && self.aborted.is_none()
            && !self.results.is_empty()
            && self.results.iter().all(|r| r.passed);
        self
    }

    pub fn result(&self, name: &str) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.name == name)
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.cancelled {
            ExitCode::Interrupted
        } else {
            ExitCode::from_passed(self.passed)
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Smoke test: {}", self.url);

        let stats_line = |label: &str, s: &SimStats| {
            format!(
                "  {:<8} plants={} seeds={} water={} ticks={}",
                label, s.plant_count, s.seed_count, s.water_cells, s.tick_count
            )
        };
        if let Some(ref s) = self.initial {
            let _ = writeln!(out, "{}", stats_line("initial", s));
        }
        if let Some(ref s) = self.after_run {
            let _ = writeln!(out, "{}", stats_line("run", s));
        }
        if let Some(ref s) = self.after_seeds {
            let _ = writeln!(out, "{}", stats_line("seeds", s));
        }
        for msg in &self.seed_messages {
            let _ = writeln!(out, "  console: {}", msg);
        }

        for r in &self.results {
            let mark = if r.passed { "✓" } else { "✗" };
            let _ = writeln!(out, "  {} {}", mark, r.name);
        }
        if let Some(ref reason) = self.aborted {
            let _ = writeln!(out, "  ✗ aborted: {}", reason);
        }
        for shot in &self.screenshots {
            let _ = writeln!(out, "  screenshot: {}", shot.display());
        }

        let verdict = if self.cancelled {
            "CANCELLED"
        } else if self.passed {
            "PASS"
        } else {
            "FAIL"
        };
        let passed = self.results.iter().filter(|r| r.passed).count();
        let _ = write!(out, "Overall: {} ({}/{} checks passed)", verdict, passed, self.results.len());
        out
    }
}

fn stats<D: Driver>(driver: &mut D) -> Result<SimStats, DriverError> {
    let value = driver.evaluate(GET_STATS)?;
    serde_json::from_value(value).map_err(|e| DriverError::UnexpectedPayload {
        op: "getStats",
        reason: e.to_string(),
    })
}

fn screenshot<D: Driver>(
    driver: &mut D,
    opts: &SmokeOptions,
    report: &mut SmokeReport,
    name: &str,
) -> Result<(), DriverError> {
    let path = opts.screenshot_dir.join(format!("test_{}.png", name));
    driver.screenshot(&path)?;
    log::info!("screenshot saved: {}", path.display());
    report.screenshots.push(path);
    Ok(())
}

/// Run the scenario, then close the driver whatever happened.
pub fn run_scenario<D: Driver>(
    driver: &mut D,
    opts: &SmokeOptions,
    cancel: &CancelToken,
) -> Result<SmokeReport, DriverError> {
    let mut report = SmokeReport::new(&opts.url);
    let result = drive(driver, opts, cancel, &mut report);

    if let Err(e) = driver.close() {
        log::warn!("closing driver failed: {}", e);
    }

    result.map(|()| report.finish())
}

fn drive<D: Driver>(
    driver: &mut D,
    opts: &SmokeOptions,
    cancel: &CancelToken,
    report: &mut SmokeReport,
) -> Result<(), DriverError> {
    log::info!("loading {}", opts.url);
    driver.goto(&opts.url)?;

    if driver.evaluate(ENGINE_PRESENT)? != Value::Bool(true) {
        report.aborted = Some("window.simulationEngine is not defined".to_string());
        return Ok(());
    }

    let initial = stats(driver)?;
    report.initial = Some(initial);
    report.record(CHECK_WATER, initial.water_cells > 0);
    report.record(CHECK_PLANTS, initial.plant_count > 0);
    screenshot(driver, opts, report, "initial")?;

    // Timed run
    driver.click(&opts.start_selector)?;
    let threshold = opts.tick_threshold;
    let outcome = poll_until(opts.run_poll, cancel, || {
        let s = stats(driver)?;
        log::debug!("tick {}", s.tick_count);
        Ok::<_, DriverError>((s.tick_count > threshold).then_some(s))
    })?;
    driver.click(&opts.pause_selector)?;
    if outcome == PollOutcome::Cancelled {
        report.cancelled = true;
        return Ok(());
    }
    if let PollOutcome::TimedOut { elapsed, .. } = outcome {
        log::warn!("simulation did not pass {} ticks within {:?}", threshold, elapsed);
    }
    let after_run = stats(driver)?;
    report.after_run = Some(after_run);
    report.record(CHECK_ADVANCING, after_run.tick_count > threshold);
    screenshot(driver, opts, report, "final")?;

    // Seed generation after a reset
    driver.evaluate(RESET)?;
    driver.drain_console()?;
    driver.click(&opts.start_selector)?;

    // Stats are read before the console so a message logged alongside the
    // first seed is drained in the same attempt.
    let mut seen = Vec::new();
    let outcome = poll_until(opts.seed_poll, cancel, || {
        let s = stats(driver)?;
        opts.collect_seed_messages(driver, &mut seen)?;
        Ok::<_, DriverError>((!seen.is_empty() || s.seed_count > 0).then_some(()))
    })?;
    driver.click(&opts.pause_selector)?;
    if outcome == PollOutcome::Cancelled {
        report.seed_messages = seen;
        report.cancelled = true;
        return Ok(());
    }
    let after_seeds = stats(driver)?;
    opts.collect_seed_messages(driver, &mut seen)?;
    report.seed_messages = seen;
    report.after_seeds = Some(after_seeds);
    let seeded = !report.seed_messages.is_empty() || after_seeds.seed_count > 0;
    report.record(CHECK_SEEDS, seeded);

    let color = match driver.evaluate(SEED_COLOR)? {
        Value::String(s) => s,
        other => other.to_string(),
    };
    report.record(CHECK_SEED_COLOR, color == opts.expected_seed_color);
    report.seed_color = Some(color);

    screenshot(driver, opts, report, "with_seeds")?;
    Ok(())
}
