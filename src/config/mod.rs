//! Configuration layering
//!
//! Precedence, lowest first:
//! 1. Built-in defaults
//! 2. Project file (`cellops.toml` in the base directory, or `--config`)
//! 3. CLI flags

mod defaults;
mod effective;
mod merge;
mod project;

pub use defaults::{builtin, DEFAULT_CONFIG_FILE};
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use merge::{merge_into, merge_layers};
pub use project::{
    ArtifactDef, CheckSet, CheckSetDef, DeployConfig, ProjectConfig, SmokeConfig, StampConfig,
};
