// Draft turn engine daemon.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config
// 3. Open database
// 4. Build the engine
// 5. Spawn Ctrl+C listener
// 6. Run the automation ticker until shutdown

use std::sync::Arc;

use anyhow::Context;
use draftday_core::clock::SystemClock;
use draftday_core::config;
use draftday_core::db::Database;
use draftday_core::engine::{Engine, EngineConfig};
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("draftday starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: tick={}s, presence stale after {}s",
        config.tick_seconds, config.stale_after_seconds
    );

    // 3. Open database
    let db = Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    // 4. Build the engine
    let engine = Engine::new(Arc::new(db), SystemClock, EngineConfig::from(&config));

    // 5. Ctrl+C flips the shutdown flag
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl+C received, shutting down"),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
        let _ = shutdown_tx.send(true);
    });

    // 6. Run until shutdown
    let sweeps = draftday_ticker::run_ticker(&engine, config.tick_period(), shutdown_rx).await;

    info!("draftday shut down cleanly after {} sweeps", sweeps);
    Ok(())
}

/// Initialize tracing to log to `logs/draftday.log` under the working directory.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("draftday.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("draftday=info,draftday_core=info,draftday_ticker=info,warn")
            }),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
