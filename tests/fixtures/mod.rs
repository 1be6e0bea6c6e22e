//! Project fixtures for integration tests
//!
//! Writes a miniature copy of the simulation's source tree into a scratch
//! directory, with content that satisfies every check in
//! `cellops.example.toml`.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Path to the example configuration shipped with the crate
pub fn example_config_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("cellops.example.toml")
}

pub const WATER_SYSTEM: &str = r#"export class WaterSystem {
    generateRiver() {
        if (Math.random() < 0.4) {
            this.branch();
        }
        for (const source of this.sources) {
            this.propagateWater(source.x, source.y, 20);
            this.propagateWaterOptimized(source.x, source.y, 6);
        }
    }

    addWaterFlow(x, y) {
        this.grid.set(x, y, 'water');
    }
}
"#;

pub const RENDERER: &str = r#"export class Renderer {
    constructor() {
        this.colors = {
            plant: '#2e8b57',
            seed: '#ffff00',
            water: '#1e90ff',
        };
    }
}
"#;

pub const ENERGY_SYSTEM: &str = r#"export class EnergySystem {
    isShaded(cell) {
        // ТОЛЬКО растения блокируют свет
        return cell.type === 'plant';
    }
}
"#;

pub const PLANT: &str = r#"export class Plant {
    tryGrow(grid) {
        if (!this.isAlive) {
            return false;
        }
        return this.grow(grid);
    }

    generateSeeds(grid) {
        return [];
    }
}
"#;

pub const PLANT_MANAGER: &str = r#"export class PlantManager {
    update(grid) {
        for (const plant of this.plants) {
            if (plant.size >= plant.maxSize) {
                console.log(`Plant ${plant.id} reached max size, generating seeds`);
                plant.generateSeeds(grid);
            }
        }
    }

    spawn(grid) {
        const waterCells = [];
        return waterCells;
    }
}
"#;

pub const SIMULATION_ENGINE: &str = r#"export class SimulationEngine {
    init() {
        // ВАЖНО: Сначала генерируем реку, потом растения
        this.water.generateRiver();
        this.plants.spawn(this.grid);
    }

    tick() {
        if (this.tickCount % 10 === 0) {
            this.water.update();
        }
        this.tickCount++;
    }
}
"#;

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
    <canvas id="world"></canvas>
    <script type="module" src="js/main.js"></script>
</body>
</html>
"#;

pub const README: &str = "# 🌱 Клеточная Жизнь\n\nRun with `python -m http.server 8080`.\n";

pub const VERSION_JS: &str =
    "export const APP_VERSION = '1.0.0';\nexport const BUILD_DATE = '2025-01-01 00:00:00';\n";

/// Write `content` to `root/rel`, creating parent directories.
pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// A project tree on which every example check passes
pub fn healthy_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "js/WaterSystem.js", WATER_SYSTEM);
    write(root, "js/Renderer.js", RENDERER);
    write(root, "js/EnergySystem.js", ENERGY_SYSTEM);
    write(root, "js/Plant.js", PLANT);
    write(root, "js/PlantManager.js", PLANT_MANAGER);
    write(root, "js/SimulationEngine.js", SIMULATION_ENGINE);
    write(root, "js/Version.js", VERSION_JS);
    write(root, "index.html", INDEX_HTML);
    write(root, "README.md", README);
    dir
}
