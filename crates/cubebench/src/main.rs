//! Cube rendering benchmark.
//!
//! Draws up to 50 000 textured cubes with a naive, batched or instanced strategy.
//! A "Benchmark" panel sets the object count, renderer and vsync and shows the
//! frame rate; once a second the statistics also go to the window title and log.

mod app;
mod camera;
mod config;
mod overlay;
mod panel;

use anyhow::{Context, Result};
use cubebench_core::{AssetRoot, SceneAssets};
use cubebench_engine::device::GpuInit;
use cubebench_engine::logging::{LoggingConfig, init_logging};
use cubebench_engine::window::Runtime;

use app::BenchApp;
use config::BenchConfig;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = BenchConfig::from_env();
    let root = AssetRoot::locate(&config.asset_root)
        .with_context(|| format!("set {} to the asset directory", config::ENV_ASSETS))?;
    let assets = SceneAssets::new(&root).with_positions(config.positions);

    log::info!(
        "starting with {} ({} objects, vsync {})",
        config.strategy,
        config.objects,
        if config.vsync { "on" } else { "off" }
    );

    let app = BenchApp::new(&config, assets);
    Runtime::run(
        config.runtime_config(),
        GpuInit::default().with_vsync(config.vsync),
        app,
    )
}
