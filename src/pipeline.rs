//! Command orchestration
//!
//! Each subcommand loads the layered configuration once into a [`Context`]
//! and hands typed settings to the module that does the work. Nothing here
//! prints; callers render the returned reports.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde_json::{json, Value};
use thiserror::Error;

use crate::config::{merge_into, ConfigError, EffectiveConfig, ProjectConfig, DEFAULT_CONFIG_FILE};
use crate::deploy::{self, CommandRunner, DeployReport, DeployRequest};
use crate::signal::CancelToken;
use crate::smoke::{run_scenario, Driver, DriverError, SmokeOptions, SmokeReport};
use crate::stamp::{self, StampError, StampOutcome};
use crate::summary::{CheckSummary, ExitCode};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("stamp error: {0}")]
    Stamp(#[from] StampError),

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            PipelineError::Config(_) => ExitCode::Config,
            _ => ExitCode::Failure,
        }
    }
}

/// Loaded configuration for one invocation
#[derive(Debug, Clone)]
pub struct Context {
    pub effective: EffectiveConfig,
    pub project: ProjectConfig,
}

impl Context {
    /// Build the configuration stack.
    ///
    /// An explicit `config` path must exist; otherwise `cellops.toml` in the
    /// base directory is used when present. `overrides` is the CLI layer;
    /// `base_dir` is folded into it.
    pub fn load(
        base_dir: Option<&Path>,
        config: Option<&Path>,
        mut overrides: Value,
    ) -> Result<Self, ConfigError> {
        let (path, required) = match config {
            Some(p) => (p.to_path_buf(), true),
            None => (
                base_dir.unwrap_or_else(|| Path::new(".")).join(DEFAULT_CONFIG_FILE),
                false,
            ),
        };

        if let Some(dir) = base_dir {
            merge_into(&mut overrides, json!({ "base_dir": dir.display().to_string() }));
        }
        let cli = match overrides {
            Value::Object(ref map) if map.is_empty() => None,
            Value::Null => None,
            other => Some(other),
        };

        let effective = EffectiveConfig::build(Some(&path), required, cli)?;
        let project = effective.project()?;
        log::debug!("base directory: {}", project.base_dir.display());
        Ok(Self { effective, project })
    }

    pub fn base_dir(&self) -> &Path {
        &self.project.base_dir
    }
}

/// Run the named check sets (all when `names` is empty).
pub fn run_checks(
    ctx: &Context,
    names: &[String],
    parallel: bool,
) -> Result<CheckSummary, PipelineError> {
    let sets = ctx.project.check_sets(names)?;
    let started = Instant::now();

    let mut summary = CheckSummary::new(ctx.effective.file_digest().map(str::to_string));
    for set in sets {
        log::info!("running check set '{}' ({} artifacts)", set.name, set.specs.len());
        let report = if parallel {
            cellops_checker::check_all_parallel(&set.specs)
        } else {
            cellops_checker::check_all(&set.specs)
        };
        summary.add_set(set.name, set.title, report);
    }

    Ok(summary.with_duration_ms(started.elapsed().as_millis() as u64))
}

/// Stamp the version file, `file` overriding the configured one.
pub fn run_stamp(ctx: &Context, file: Option<&Path>) -> Result<(PathBuf, StampOutcome), PipelineError> {
    let target = ctx.project.resolve(file.unwrap_or(ctx.project.stamp.file.as_path()));
    let timestamp = stamp::format_now(&ctx.project.stamp.format)?;
    let outcome = stamp::stamp_file(&target, &timestamp)?;
    Ok((target, outcome))
}

/// Stage, commit and push the base directory.
pub fn run_deploy<R: CommandRunner>(
    ctx: &Context,
    runner: &R,
    message: Option<String>,
    with_stamp: bool,
    cancel: &CancelToken,
) -> DeployReport {
    let config = &ctx.project.deploy;
    let request = DeployRequest {
        message: message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| config.message.clone()),
        remote: config.remote.clone(),
        branch: config.branch.clone(),
        stamp: with_stamp.then(|| {
            (
                ctx.project.resolve(&ctx.project.stamp.file),
                ctx.project.stamp.format.clone(),
            )
        }),
    };
    deploy::deploy(runner, ctx.base_dir(), &request, cancel)
}

/// Run the smoke scenario through `driver`.
pub fn run_smoke<D: Driver>(
    ctx: &Context,
    driver: &mut D,
    cancel: &CancelToken,
) -> Result<SmokeReport, PipelineError> {
    let opts = SmokeOptions::from_config(&ctx.project.smoke, ctx.base_dir());
    Ok(run_scenario(driver, &opts, cancel)?)
}
