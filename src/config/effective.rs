//! Effective configuration with provenance
//!
//! Records the merged configuration value plus where each contributing
//! layer came from, so a report can say which config produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::defaults;
use super::merge::merge_layers;
use super::project::ProjectConfig;

/// Schema version for effective_config
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "cellops/effective_config@1";

/// Origin of a configuration layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Cli,
}

/// A contributing layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (file layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes (file layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged configuration plus provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub schema_version: u32,
    pub schema_id: String,
    pub created_at: DateTime<Utc>,

    /// The merged configuration object
    pub config: Value,

    /// Contributing layers in precedence order
    pub sources: Vec<ConfigSource>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("cannot parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("check set '{set}', artifact '{artifact}': {source}")]
    Check {
        set: String,
        artifact: String,
        #[source]
        source: cellops_checker::PredicateError,
    },

    #[error("unknown check set '{0}'")]
    UnknownCheckSet(String),
}

impl EffectiveConfig {
    /// Merge built-in defaults, the optional config file and CLI overrides.
    ///
    /// A config file that was asked for explicitly must exist; the default
    /// location is skipped when absent.
    pub fn build(
        config_path: Option<&Path>,
        required: bool,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![defaults::builtin()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        if let Some(path) = config_path {
            if path.exists() || required {
                let (value, digest) = load_toml_file(path)?;
                log::debug!("loaded config layer {} ({})", path.display(), digest);
                layers.push(value);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::File,
                    path: Some(path.display().to_string()),
                    digest: Some(digest),
                });
            } else {
                log::debug!("no config file at {}, using defaults", path.display());
            }
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config: merge_layers(layers),
            sources,
        })
    }

    /// Deserialize and validate the typed project configuration.
    pub fn project(&self) -> Result<ProjectConfig, ConfigError> {
        let project: ProjectConfig = serde_json::from_value(self.config.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        project.validate()?;
        Ok(project)
    }

    /// Digest of the config file layer, if one was loaded
    pub fn file_digest(&self) -> Option<&str> {
        self.sources
            .iter()
            .find(|s| s.origin == ConfigOrigin::File)
            .and_then(|s| s.digest.as_deref())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Parse a TOML file into a JSON value, returning it with the file digest.
///
/// A relative `base_dir` inside the file is anchored at the file's own
/// directory.
fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let digest = hex::encode(Sha256::digest(&bytes));

    let text = String::from_utf8(bytes).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: format!("invalid UTF-8: {}", e),
    })?;

    let mut value: Value = toml::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let relative_base = value
        .get("base_dir")
        .and_then(Value::as_str)
        .map(PathBuf::from)
        .filter(|p| p.is_relative());
    if let Some(base) = relative_base {
        let anchor = path.parent().unwrap_or_else(|| Path::new("."));
        value["base_dir"] = Value::String(anchor.join(base).display().to_string());
    }

    Ok((value, digest))
}
