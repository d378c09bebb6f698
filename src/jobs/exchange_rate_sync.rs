use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::config::SchedulerConfig;
use crate::services::sync_engine::SyncEngine;
use crate::services::sync_status::{self, EXCHANGE_RATE_SYNC_JOB};

/// Spawn the periodic exchange rate sync.
///
/// Only the startup run is gated on the recorded status, so a quick restart
/// does not sync twice. After that every tick runs.
///
/// Returns `None` without scheduling anything when the scheduler is disabled.
pub fn start_exchange_rate_sync_job(
    db: DatabaseConnection,
    engine: SyncEngine,
    config: SchedulerConfig,
) -> Option<JoinHandle<()>> {
    if !config.enabled {
        tracing::info!("Exchange rate sync scheduler is disabled");
        return None;
    }

    let interval_secs = i32::try_from(config.interval.as_secs()).unwrap_or(i32::MAX);

    Some(tokio::spawn(async move {
        let mut ticker = interval(config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // First tick completes immediately
        ticker.tick().await;

        match sync_status::should_sync(&db, EXCHANGE_RATE_SYNC_JOB, interval_secs).await {
            Ok(true) => {
                tracing::info!("Starting exchange rate sync (startup or interval elapsed)");
                run_and_record(&db, &engine, interval_secs).await;
            }
            Ok(false) => {
                tracing::info!("Skipping exchange rate sync on startup (recently synced)");
            }
            Err(e) => {
                tracing::warn!("Failed to check sync status, running sync anyway: {}", e);
                run_and_record(&db, &engine, interval_secs).await;
            }
        }

        loop {
            ticker.tick().await;
            tracing::info!("Running scheduled exchange rate synchronization");
            run_and_record(&db, &engine, interval_secs).await;
        }
    }))
}

async fn run_and_record(db: &DatabaseConnection, engine: &SyncEngine, interval_secs: i32) {
    let report = engine.run_sync().await;

    if let Err(e) = sync_status::record_run(db, EXCHANGE_RATE_SYNC_JOB, &report, interval_secs).await {
        tracing::warn!("Failed to record sync run: {}", e);
    }
}
