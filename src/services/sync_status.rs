//! Run bookkeeping for the scheduled exchange rate sync.
//!
//! Lets a restarted process skip its startup run when the previous run
//! finished less than one interval ago. `min_interval_secs` records the
//! interval in effect at the last run.

use chrono::{Duration, NaiveDateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};

use crate::entities::sync_status::{self, Entity as SyncStatus};
use crate::models::sync::SyncReport;

pub const EXCHANGE_RATE_SYNC_JOB: &str = "exchange_rate_sync";

pub async fn find_status(
    db: &DatabaseConnection,
    job_name: &str,
) -> Result<Option<sync_status::Model>, DbErr> {
    SyncStatus::find()
        .filter(sync_status::Column::JobName.eq(job_name))
        .one(db)
        .await
}

/// Whether `interval_secs` has passed since the last successful run.
///
/// The interval comes from the current configuration, not from the row.
pub async fn should_sync(
    db: &DatabaseConnection,
    job_name: &str,
    interval_secs: i32,
) -> Result<bool, DbErr> {
    let Some(record) = find_status(db, job_name).await? else {
        tracing::info!("[{}] First run detected, will sync", job_name);
        return Ok(true);
    };

    let Some(last_success) = record.last_success_at else {
        tracing::info!("[{}] No previous successful sync, will sync", job_name);
        return Ok(true);
    };

    Ok(is_due(last_success, Utc::now().naive_utc(), interval_secs, job_name))
}

fn is_due(last_success: NaiveDateTime, now: NaiveDateTime, interval_secs: i32, job_name: &str) -> bool {
    let elapsed = now.signed_duration_since(last_success);
    let interval = Duration::seconds(i64::from(interval_secs));

    if elapsed >= interval {
        tracing::info!(
            "[{}] Last sync was {}s ago (min: {}s), will sync",
            job_name,
            elapsed.num_seconds(),
            interval_secs
        );
        true
    } else {
        tracing::info!(
            "[{}] Skipping sync - last sync was {}s ago, next sync in {}s",
            job_name,
            elapsed.num_seconds(),
            (interval - elapsed).num_seconds()
        );
        false
    }
}

/// Persist the outcome of a finished run.
///
/// A run counts as failed only when every pair failed; partial failures are
/// still a success but keep their summary in `last_error`.
pub async fn record_run(
    db: &DatabaseConnection,
    job_name: &str,
    report: &SyncReport,
    interval_secs: i32,
) -> Result<(), DbErr> {
    let now = Utc::now().naive_utc();
    let failed = report.all_failed();
    let inserted = i64::try_from(report.total_inserted()).unwrap_or(i64::MAX);
    let failed_pairs = i32::try_from(report.failed_pairs()).unwrap_or(i32::MAX);
    let last_error = report.failure_summary();

    match find_status(db, job_name).await? {
        Some(record) => {
            let success_count = record.success_count;
            let error_count = record.error_count;
            let mut active: sync_status::ActiveModel = record.into();

            active.last_attempt_at = Set(Some(now));
            active.last_error = Set(last_error);
            active.last_run_inserted = Set(inserted);
            active.last_run_failed_pairs = Set(failed_pairs);
            active.min_interval_secs = Set(interval_secs);
            if failed {
                active.error_count = Set(error_count + 1);
            } else {
                active.last_success_at = Set(Some(now));
                active.success_count = Set(success_count + 1);
            }
            active.update(db).await?;
        }
        None => {
            sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_success_at: Set((!failed).then_some(now)),
                last_attempt_at: Set(Some(now)),
                last_error: Set(last_error),
                success_count: Set(if failed { 0 } else { 1 }),
                error_count: Set(if failed { 1 } else { 0 }),
                last_run_inserted: Set(inserted),
                last_run_failed_pairs: Set(failed_pairs),
                min_interval_secs: Set(interval_secs),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    if failed {
        tracing::warn!("[{}] Recorded failed sync run", job_name);
    } else {
        tracing::debug!("[{}] Recorded sync run ({} inserted)", job_name, inserted);
    }
    Ok(())
}
