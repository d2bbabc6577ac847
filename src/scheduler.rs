use crate::config::Config;
use crate::db::Database;
use crate::error::SyncError;
use crate::filesystem::YamlTranslationSource;
use crate::i18n::LocaleProvider;
use crate::report::SyncReport;
use crate::retry::{retry_run, Failure, RetryPolicy};
use crate::sync::DictionarySynchronizer;
use anyhow::Result;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

/// Initialize and start the scheduler
pub async fn start_scheduler(config: Arc<Config>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    for time in &config.schedule_times {
        let cron_expr = time_to_cron(time)?;
        info!("Scheduling dictionary sync for {} UTC (cron: {})", time, cron_expr);

        let config_clone = Arc::clone(&config);

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _l| {
            let config = Arc::clone(&config_clone);

            Box::pin(async move {
                info!("⏰ Scheduled dictionary sync triggered");
                if let Err(e) = run_sync_job(&config).await {
                    error!("Scheduled dictionary sync failed: {:#}", e);
                }
            })
        })?;

        scheduler.add(job).await?;
    }

    scheduler.start().await?;
    info!("✓ Scheduler started");

    Ok(scheduler)
}

/// Convert a UTC time string (HH:MM) to a daily cron expression
fn time_to_cron(time: &str) -> Result<String> {
    let parts: Vec<&str> = time.split(':').collect();
    if parts.len() != 2 {
        anyhow::bail!("Invalid time format: {}. Expected HH:MM", time);
    }

    let hour: u8 = parts[0].parse()?;
    let minute: u8 = parts[1].parse()?;
    if hour > 23 || minute > 59 {
        anyhow::bail!("Invalid time: {}. Hour must be 0-23 and minute 0-59", time);
    }

    // Cron format: "second minute hour day month day_of_week"
    Ok(format!("0 {} {} * * *", minute, hour))
}

/// Run one synchronization, retrying the whole run on write and store failures
pub async fn run_sync_job(config: &Config) -> Result<SyncReport> {
    let policy = RetryPolicy::for_runs(config.max_attempts);

    retry_run(&policy, "Dictionary sync", || run_sync_once(config), classify).await
}

async fn run_sync_once(config: &Config) -> Result<SyncReport> {
    let db = Database::connect(&config.database_url).await?;

    let locales = match &config.locales {
        Some(configured) => configured.locales().await?,
        None => db.locales().await?,
    };
    if locales.is_empty() {
        warn!("No locales to synchronize; the dictionary will be emptied");
    }

    let source = YamlTranslationSource::new(&config.translations_dir, config.translation_domain.as_str());
    let mut synchronizer =
        DictionarySynchronizer::new(source, db).with_purge_batch_size(config.purge_batch_size);

    Ok(synchronizer.synchronize(&locales).await?)
}

/// Malformed translation files fail fast; everything else may be transient
fn classify(error: &anyhow::Error) -> Failure {
    match error.downcast_ref::<SyncError>() {
        Some(e) if !e.is_retryable() => Failure::Fatal,
        _ => Failure::Transient,
    }
}
