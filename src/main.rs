use anyhow::Result;
use dictionary_sync::{config, scheduler};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when variables come from the environment)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dictionary_sync=info".parse()?),
        )
        .init();

    let config = config::Config::from_env()?;

    if !config.is_scheduled() {
        info!("Starting one-off dictionary sync");
        let report = scheduler::run_sync_job(&config).await?;
        info!("Done: {}", report.summary());
        return Ok(());
    }

    let config = Arc::new(config);
    let mut scheduler = scheduler::start_scheduler(Arc::clone(&config)).await?;

    info!(
        "Dictionary sync scheduled at {} UTC, press Ctrl+C to stop",
        config.schedule_times.join(", ")
    );
    tokio::signal::ctrl_c().await?;

    info!("Shutting down scheduler");
    scheduler.shutdown().await?;

    Ok(())
}
