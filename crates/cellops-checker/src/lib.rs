//! Data-driven content checks over source artifacts.
//!
//! Each artifact is read once as UTF-8 text and every named predicate is
//! evaluated against the whole content. Load failures are recorded in the
//! report rather than returned as errors, so a run always completes.

mod predicate;
mod report;

pub use predicate::{Check, CheckDef, Pattern, Predicate, PredicateError};
pub use report::{ArtifactReport, CheckResult, LoadError, RunReport};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

/// An artifact path together with the checks to run against it.
#[derive(Debug, Clone)]
pub struct ArtifactSpec {
    pub path: PathBuf,
    pub checks: Vec<Check>,
}

impl ArtifactSpec {
    pub fn new(path: impl Into<PathBuf>, checks: Vec<Check>) -> Self {
        Self {
            path: path.into(),
            checks,
        }
    }
}

/// Read an artifact as UTF-8 text.
pub fn read_artifact(path: &Path) -> Result<String, LoadError> {
    let bytes = fs::read(path)?;
    String::from_utf8(bytes).map_err(|e| LoadError::Decode(e.utf8_error().to_string()))
}

/// Evaluate `checks` in order against already-loaded content.
pub fn evaluate(content: &str, checks: &[Check]) -> Vec<CheckResult> {
    checks
        .iter()
        .map(|check| CheckResult {
            name: check.name.clone(),
            passed: check.predicate.evaluate(content),
        })
        .collect()
}

fn report_for(path: &Path, checks: &[Check], loaded: &Result<String, LoadError>) -> ArtifactReport {
    match loaded {
        Ok(content) => ArtifactReport::from_results(path, evaluate(content, checks)),
        Err(e) => {
            log::debug!("cannot load {}: {}", path.display(), e);
            ArtifactReport::unreadable(path, checks.iter().map(|c| c.name.as_str()), e.clone())
        }
    }
}

/// Run every check against one artifact.
///
/// Never fails: an unreadable artifact produces a report with
/// `load_error` set and every check failed.
pub fn check_artifact(path: &Path, checks: &[Check]) -> ArtifactReport {
    report_for(path, checks, &read_artifact(path))
}

/// Check every artifact in order.
///
/// A path listed more than once is read only once per run.
pub fn check_all(specs: &[ArtifactSpec]) -> RunReport {
    let mut cache: HashMap<&Path, Result<String, LoadError>> = HashMap::new();

    let artifacts = specs
        .iter()
        .map(|spec| {
            let loaded = cache
                .entry(spec.path.as_path())
                .or_insert_with(|| read_artifact(&spec.path));
            report_for(&spec.path, &spec.checks, loaded)
        })
        .collect();

    RunReport::new(artifacts)
}

/// Same contract as [`check_all`], with one scoped thread per artifact.
///
/// The report keeps input order regardless of completion order.
pub fn check_all_parallel(specs: &[ArtifactSpec]) -> RunReport {
    let artifacts = thread::scope(|scope| {
        let handles: Vec<_> = specs
            .iter()
            .map(|spec| scope.spawn(move || check_artifact(&spec.path, &spec.checks)))
            .collect();

        handles
            .into_iter()
            .zip(specs)
            .map(|(handle, spec)| {
                handle.join().unwrap_or_else(|_| {
                    ArtifactReport::unreadable(
                        &spec.path,
                        spec.checks.iter().map(|c| c.name.as_str()),
                        LoadError::Io("check thread panicked".to_string()),
                    )
                })
            })
            .collect()
    });

    RunReport::new(artifacts)
}
