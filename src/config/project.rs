//! Typed project configuration (`cellops.toml`)

use cellops_checker::{ArtifactSpec, CheckDef};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::effective::ConfigError;

/// One artifact and the checks it must satisfy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactDef {
    /// Path relative to `base_dir` (absolute paths are used as-is)
    pub path: PathBuf,

    #[serde(default, rename = "check")]
    pub checks: Vec<CheckDef>,
}

/// A named group of artifact checks, run as one report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSetDef {
    pub name: String,

    /// Heading printed above the report
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default, rename = "artifact")]
    pub artifacts: Vec<ArtifactDef>,
}

/// A check set with compiled predicates and resolved paths
#[derive(Debug, Clone)]
pub struct CheckSet {
    pub name: String,
    pub title: String,
    pub specs: Vec<ArtifactSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    pub remote: String,
    pub branch: String,
    /// Commit message used when none is given on the command line
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampConfig {
    /// Version metadata file holding the `BUILD_DATE` assignment
    pub file: PathBuf,
    /// chrono format string for the timestamp
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeConfig {
    pub url: String,

    /// argv of the browser driver process
    pub driver: Vec<String>,

    pub screenshot_dir: PathBuf,
    pub start_selector: String,
    pub pause_selector: String,

    /// The timed run passes once the tick count exceeds this
    pub tick_threshold: u64,

    pub poll_interval_ms: u64,

    /// Longest wait for a single driver response
    pub request_timeout_ms: u64,
    pub run_timeout_seconds: u64,
    pub seed_timeout_seconds: u64,
    pub expected_seed_color: String,

    /// Console substrings that count as evidence of seed generation
    pub seed_messages: Vec<String>,
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub base_dir: PathBuf,

    #[serde(default, rename = "check_set")]
    pub check_sets: Vec<CheckSetDef>,

    pub deploy: DeployConfig,
    pub stamp: StampConfig,
    pub smoke: SmokeConfig,
}

impl ProjectConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for set in &self.check_sets {
            if set.name.trim().is_empty() {
                return Err(ConfigError::Invalid("check set name must not be empty".to_string()));
            }
            if !seen.insert(set.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate check set '{}'",
                    set.name
                )));
            }
            for artifact in &set.artifacts {
                if artifact.path.as_os_str().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "check set '{}' has an artifact with an empty path",
                        set.name
                    )));
                }
            }
        }

        if self.smoke.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("smoke.poll_interval_ms must be > 0".to_string()));
        }
        if self.smoke.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("smoke.request_timeout_ms must be > 0".to_string()));
        }
        if self.smoke.run_timeout_seconds == 0 || self.smoke.seed_timeout_seconds == 0 {
            return Err(ConfigError::Invalid("smoke timeouts must be > 0".to_string()));
        }

        Ok(())
    }

    /// Resolve a project-relative path against `base_dir`.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Compile the named check sets, or all of them when `names` is empty.
    ///
    /// Sets come back in declaration order; invalid predicates and unknown
    /// names are configuration errors.
    pub fn check_sets(&self, names: &[String]) -> Result<Vec<CheckSet>, ConfigError> {
        for name in names {
            if !self.check_sets.iter().any(|s| &s.name == name) {
                return Err(ConfigError::UnknownCheckSet(name.clone()));
            }
        }

        self.check_sets
            .iter()
            .filter(|set| names.is_empty() || names.contains(&set.name))
            .map(|set| self.compile_set(set))
            .collect()
    }

    fn compile_set(&self, set: &CheckSetDef) -> Result<CheckSet, ConfigError> {
        let specs = set
            .artifacts
            .iter()
            .map(|artifact| {
                let checks = artifact
                    .checks
                    .iter()
                    .map(CheckDef::compile)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|source| ConfigError::Check {
                        set: set.name.clone(),
                        artifact: artifact.path.display().to_string(),
                        source,
                    })?;
                Ok(ArtifactSpec::new(self.resolve(&artifact.path), checks))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(CheckSet {
            name: set.name.clone(),
            title: set.title.clone().unwrap_or_else(|| set.name.clone()),
            specs,
        })
    }
}
