//! Build date stamping
//!
//! Rewrites the `BUILD_DATE = '...'` assignment in the version metadata
//! file. The file is written only when the formatted timestamp differs from
//! the one already present, so two runs within the same second leave the
//! file untouched the second time.

use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Errors from the stamp step
#[derive(Debug, thiserror::Error)]
pub enum StampError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no BUILD_DATE assignment found in {0}")]
    MarkerNotFound(PathBuf),

    #[error("invalid timestamp format '{0}'")]
    BadFormat(String),
}

/// What the stamp step did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StampOutcome {
    Unchanged { value: String },
    Updated { previous: String, current: String },
}

impl StampOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, StampOutcome::Updated { .. })
    }
}

fn marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r#"BUILD_DATE\s*=\s*(?:'([^'\n]*)'|"([^"\n]*)")"#)
            .expect("static pattern compiles")
    })
}

/// Format the current local time, rejecting malformed format strings.
pub fn format_now(format: &str) -> Result<String, StampError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(StampError::BadFormat(format.to_string()));
    }
    Ok(Local::now().format(format).to_string())
}

/// Replace the timestamp inside `content`.
///
/// Returns the new content (`None` when unchanged) and the outcome, or
/// `None` when there is no assignment to rewrite.
pub fn restamp(content: &str, timestamp: &str) -> Option<(Option<String>, StampOutcome)> {
    let caps = marker().captures(content)?;
    let value = caps.get(1).or_else(|| caps.get(2))?;
    let previous = value.as_str();

    if previous == timestamp {
        return Some((
            None,
            StampOutcome::Unchanged {
                value: previous.to_string(),
            },
        ));
    }

    let mut updated = String::with_capacity(content.len() + timestamp.len());
    updated.push_str(&content[..value.start()]);
    updated.push_str(timestamp);
    updated.push_str(&content[value.end()..]);

    Some((
        Some(updated),
        StampOutcome::Updated {
            previous: previous.to_string(),
            current: timestamp.to_string(),
        },
    ))
}

/// Stamp `path` with `timestamp`, writing only on change.
pub fn stamp_file(path: &Path, timestamp: &str) -> Result<StampOutcome, StampError> {
    let io_err = |source| StampError::Io {
        path: path.to_path_buf(),
        source,
    };

    let content = fs::read_to_string(path).map_err(io_err)?;
    let (updated, outcome) =
        restamp(&content, timestamp).ok_or_else(|| StampError::MarkerNotFound(path.to_path_buf()))?;

    if let Some(updated) = updated {
        fs::write(path, updated).map_err(io_err)?;
        log::info!("stamped {} with {}", path.display(), timestamp);
    } else {
        log::debug!("{} already stamped {}", path.display(), timestamp);
    }

    Ok(outcome)
}
