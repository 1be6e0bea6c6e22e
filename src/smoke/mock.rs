//! In-process page double for scenario tests

use std::path::{Path, PathBuf};

use cellops_driver::{ErrorCode, ErrorPayload, ProtocolError};
use serde_json::Value;

use super::driver::{Driver, DriverError};
use super::scenario::{SimStats, ENGINE_PRESENT, GET_STATS, RESET, SEED_COLOR};

/// Fakes the simulation page: ticks advance each time stats are read while
/// running, and seeds appear once the tick count crosses a threshold.
pub struct FakePage {
    pub engine_present: bool,
    pub stats: SimStats,
    pub running: bool,
    pub ticks_per_probe: u64,
    /// Tick count the page never goes past
    pub tick_limit: Option<u64>,
    pub seed_after_ticks: u64,
    pub seed_message: Option<String>,
    pub seed_color: Option<String>,
    pub fail_clicks: bool,
    pub closed: bool,
    pub screenshots: Vec<PathBuf>,
    console: Vec<String>,
    seeded: bool,
}

impl FakePage {
    pub fn healthy() -> Self {
        Self {
            engine_present: true,
            stats: SimStats {
                plant_count: 5,
                seed_count: 0,
                water_cells: 40,
                tick_count: 0,
            },
            running: false,
            ticks_per_probe: 250,
            tick_limit: None,
            seed_after_ticks: 500,
            seed_message: Some("Plant 3 reached max size, generating seeds".to_string()),
            seed_color: Some("#ffff00".to_string()),
            fail_clicks: false,
            closed: false,
            screenshots: Vec::new(),
            console: Vec::new(),
            seeded: false,
        }
    }

    fn remote(code: ErrorCode, message: String) -> DriverError {
        DriverError::Protocol(ProtocolError::Remote(ErrorPayload { code, message }))
    }

    fn advance(&mut self) {
        if !self.running {
            return;
        }
        self.stats.tick_count += self.ticks_per_probe;
        if let Some(limit) = self.tick_limit {
            self.stats.tick_count = self.stats.tick_count.min(limit);
        }
        if !self.seeded && self.ticks_per_probe > 0 && self.stats.tick_count >= self.seed_after_ticks {
            self.seeded = true;
            self.stats.seed_count += 2;
            if let Some(ref msg) = self.seed_message {
                self.console.push(msg.clone());
            }
        }
    }
}

impl Driver for FakePage {
    fn goto(&mut self, _url: &str) -> Result<(), DriverError> {
        Ok(())
    }

    fn evaluate(&mut self, expression: &str) -> Result<Value, DriverError> {
        match expression {
            ENGINE_PRESENT => Ok(Value::Bool(self.engine_present)),
            GET_STATS => {
                self.advance();
                Ok(serde_json::to_value(self.stats).unwrap())
            }
            RESET => {
                self.stats.tick_count = 0;
                self.stats.seed_count = 0;
                self.seeded = false;
                self.console.push("Simulation reset".to_string());
                Ok(Value::Null)
            }
            SEED_COLOR => Ok(Value::String(
                self.seed_color.clone().unwrap_or_else(|| "not found".to_string()),
            )),
            other => Err(Self::remote(
                ErrorCode::EvaluationFailed,
                format!("unexpected expression: {}", other),
            )),
        }
    }

    fn click(&mut self, selector: &str) -> Result<(), DriverError> {
        if self.fail_clicks {
            return Err(Self::remote(
                ErrorCode::ElementNotFound,
                format!("no element matches {}", selector),
            ));
        }
        match selector {
            "#startBtn" => self.running = true,
            "#pauseBtn" => self.running = false,
            other => {
                return Err(Self::remote(
                    ErrorCode::ElementNotFound,
                    format!("no element matches {}", other),
                ))
            }
        }
        Ok(())
    }

    fn screenshot(&mut self, path: &Path) -> Result<(), DriverError> {
        self.screenshots.push(path.to_path_buf());
        Ok(())
    }

    fn drain_console(&mut self) -> Result<Vec<String>, DriverError> {
        Ok(std::mem::take(&mut self.console))
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.closed = true;
        Ok(())
    }
}
