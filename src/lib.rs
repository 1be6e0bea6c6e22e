//! cellops - development operations for the cellular-life simulation
//!
//! Static artifact checks over the simulation's source files, a git deploy
//! helper with build-date stamping, and a browser smoke test driven through
//! an external driver process.

pub mod config;
pub mod deploy;
pub mod pipeline;
pub mod signal;
pub mod smoke;
pub mod stamp;
pub mod summary;
pub mod timeout;

pub use config::{ConfigError, EffectiveConfig, ProjectConfig};
pub use pipeline::{Context, PipelineError};
pub use signal::CancelToken;
pub use summary::{CheckSummary, ExitCode, Status};
