//! Check report types.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// Why an artifact could not be loaded.
///
/// Recorded in the report; never propagated to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum LoadError {
    #[error("artifact not found")]
    NotFound,

    #[error("permission denied")]
    PermissionDenied,

    #[error("content is not valid UTF-8: {0}")]
    Decode(String),

    #[error("read failed: {0}")]
    Io(String),
}

impl From<io::Error> for LoadError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound,
            io::ErrorKind::PermissionDenied => LoadError::PermissionDenied,
            io::ErrorKind::InvalidData => LoadError::Decode(e.to_string()),
            _ => LoadError::Io(e.to_string()),
        }
    }
}

/// Outcome of one named check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
}

impl CheckResult {
    pub fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
        }
    }

    pub fn fail(name: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
        }
    }
}

/// Results for a single artifact, in check order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReport {
    pub path: PathBuf,
    pub all_passed: bool,

    /// Set when the artifact could not be read; every result is then failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_error: Option<LoadError>,

    pub results: Vec<CheckResult>,
}

impl ArtifactReport {
    pub fn from_results(path: &Path, results: Vec<CheckResult>) -> Self {
        let all_passed = results.iter().all(|r| r.passed);
        Self {
            path: path.to_path_buf(),
            all_passed,
            load_error: None,
            results,
        }
    }

    /// Report for an artifact that failed to load: all checks failed.
    pub fn unreadable<'a>(
        path: &Path,
        names: impl IntoIterator<Item = &'a str>,
        error: LoadError,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            all_passed: false,
            load_error: Some(error),
            results: names.into_iter().map(CheckResult::fail).collect(),
        }
    }

    pub fn has_load_error(&self) -> bool {
        self.load_error.is_some()
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.passed_count()
    }

    pub fn result(&self, name: &str) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.name == name)
    }
}

/// Results for every artifact of a run, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub passed: bool,
    pub artifacts: Vec<ArtifactReport>,
}

impl RunReport {
    pub fn new(artifacts: Vec<ArtifactReport>) -> Self {
        let passed = artifacts.iter().all(|a| a.all_passed);
        Self { passed, artifacts }
    }

    pub fn artifact(&self, path: &Path) -> Option<&ArtifactReport> {
        self.artifacts.iter().find(|a| a.path == path)
    }

    pub fn check_count(&self) -> usize {
        self.artifacts.iter().map(|a| a.results.len()).sum()
    }

    pub fn passed_count(&self) -> usize {
        self.artifacts.iter().map(|a| a.passed_count()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.check_count() - self.passed_count()
    }

    pub fn load_error_count(&self) -> usize {
        self.artifacts.iter().filter(|a| a.has_load_error()).count()
    }

    /// 0 when every artifact passed, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.passed {
            0
        } else {
            1
        }
    }
}
