//! Browser smoke test of the simulation page
//!
//! A driver process owns the browser; this module sequences the scenario,
//! waits on observable conditions instead of fixed sleeps, and records each
//! expectation as a named check.

mod driver;
#[cfg(test)]
mod mock;
mod scenario;

pub use driver::{Driver, DriverError, ProcessDriver};
pub use scenario::{
    run_scenario, SimStats, SmokeOptions, SmokeReport, CHECK_ADVANCING, CHECK_PLANTS,
    CHECK_SEEDS, CHECK_SEED_COLOR, CHECK_WATER, ENGINE_PRESENT, GET_STATS, RESET, SEED_COLOR,
    SMOKE_REPORT_SCHEMA_ID,
};
