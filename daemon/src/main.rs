use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;
use wakegated::config::load_config;
use wakegated::{DaemonServer, DaemonState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(log_filter())
        .init();

    info!("wakegate daemon (wakegated) starting...");

    let config = load_config()?;
    info!(
        "Detector settings: threshold={}, required={}, block_size={}",
        config.detector.threshold, config.detector.required, config.audio.block_size
    );

    let state = Arc::new(Mutex::new(DaemonState::new(config.clone())));
    let server = DaemonServer::new(&config, state);

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}

/// `RUST_LOG` when set, info otherwise.
fn log_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
}
