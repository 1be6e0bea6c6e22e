//! Built-in defaults (layer 1)

use serde_json::{json, Value};

/// Config file looked up in the base directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "cellops.toml";

/// Built-in default values, before any file or flag is applied.
pub fn builtin() -> Value {
    json!({
        "base_dir": ".",
        "check_set": [],
        "deploy": {
            "remote": "origin",
            "branch": "main",
            "message": "Auto-update"
        },
        "stamp": {
            "file": "js/Version.js",
            "format": "%Y-%m-%d %H:%M:%S"
        },
        "smoke": {
            "url": "http://localhost:8080/index.html",
            "driver": [],
            "screenshot_dir": ".",
            "start_selector": "#startBtn",
            "pause_selector": "#pauseBtn",
            "tick_threshold": 1000,
            "poll_interval_ms": 500,
            "request_timeout_ms": 30000,
            "run_timeout_seconds": 30,
            "seed_timeout_seconds": 40,
            "expected_seed_color": "#ffff00",
            "seed_messages": ["reached max size", "generating seeds", "Generated"]
        }
    })
}
