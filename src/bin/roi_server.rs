//! roi_server - line-crossing counting service
//!
//! This daemon:
//! 1. Loads configuration (ROI_COUNTER_CONFIG file, then ROI_COUNTER_* overrides)
//! 2. Registers the detector backends and warms up the configured one
//! 3. Serves counting requests one connection at a time until Ctrl-C

use anyhow::{anyhow, Result};
use std::sync::mpsc;

use roi_counter::{config::ServerConfig, BackendRegistry, RequestOrchestrator, RoiServer};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::load()?;
    let registry = BackendRegistry::from_settings(&config.detector)?;
    log::info!(
        "detector backends available: {}",
        registry.list().join(", ")
    );
    registry.warm_up_default()?;
    let detector = registry
        .default_backend()
        .ok_or_else(|| anyhow!("no detector backend registered"))?;

    let library = config.video_library();
    log::info!(
        "videos resolve to {}/<id>.{}",
        library.assets_dir().display(),
        library.extension()
    );
    let orchestrator = RequestOrchestrator::new(library, detector, config.tracker)
        .with_bucket_count(config.bucket_count);
    let handle = RoiServer::new(config.listener_config(), orchestrator).spawn()?;
    log::info!("roi_server listening on {}", handle.addr);

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    log::info!("roi_server waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping server...");
    handle.stop()?;

    Ok(())
}
