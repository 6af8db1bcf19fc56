use std::time::Duration;

use crate::clickup::Client;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::metrics;
use crate::normalize;
use crate::phase;
use crate::storage::{repository, Database};
use crate::sync::source::{self, FetchOutcome};
use crate::sync::{SyncOptions, SyncProgress, SyncReport};

/// Drive the full pipeline: fetch raw tasks, resolve phase times from the
/// local history and the remote time-in-status endpoint, normalize, compute
/// rollups, and upsert everything by natural key.
///
/// Failures local to one task or metric row are collected into the report's
/// error list and never abort the rest of the run. Only a missing database
/// or a failure to even record the job aborts the sync.
pub async fn run_sync(
    db: &Database,
    client: Option<&Client>,
    config: &SyncConfig,
    options: &SyncOptions,
    progress: &dyn SyncProgress,
) -> Result<SyncReport> {
    let job_id = db
        .writer()
        .call(|conn| repository::insert_sync_job(conn))
        .await?;

    let outcome = source::fetch_tasks(client, config, options, progress).await;
    let raw_tasks = match outcome {
        FetchOutcome::NotConfigured { reason } => {
            log::warn!("Sync skipped: {reason}");
            let report = SyncReport::not_configured(reason);
            finish_job(db, job_id, &report).await?;
            progress.on_complete(&report);
            return Ok(report);
        }
        FetchOutcome::Fetched(tasks) => tasks,
    };
    progress.on_tasks_fetched(raw_tasks.len());

    // Phase times: local history first, remote fills the gaps.
    let task_ids: Vec<String> = raw_tasks.iter().map(|t| t.id.clone()).collect();
    let events = db
        .reader()
        .call({
            let task_ids = task_ids.clone();
            move |conn| repository::status_events_for_tasks(conn, &task_ids)
        })
        .await?;
    let history = phase::history_phase_times(events);

    let phase_times = match client {
        Some(client) => {
            phase::resolve_phase_times(
                client,
                &task_ids,
                history,
                config.phase_batch_size,
                Duration::from_millis(config.phase_batch_delay_ms),
            )
            .await
        }
        None => history,
    };
    progress.on_phase_resolved(phase_times.len());

    let canonical = normalize::normalize_tasks(&raw_tasks, &phase_times);

    let mut errors: Vec<String> = Vec::new();
    let mut tasks_saved: u64 = 0;
    for task in &canonical {
        let result = db
            .writer()
            .call({
                let task = task.clone();
                move |conn| {
                    // Editor row first: the snapshot FK references it
                    if let Some(editor_id) = task.editor_id {
                        repository::upsert_editor_minimal(
                            conn,
                            editor_id,
                            task.editor_name.as_deref(),
                        )?;
                    }
                    repository::upsert_task_snapshot(conn, &task)
                }
            })
            .await;
        match result {
            Ok(()) => tasks_saved += 1,
            Err(e) => {
                log::warn!("Failed to save task {}: {e}", task.id);
                errors.push(format!("task {}: {e}", task.id));
            }
        }
    }

    let rollups = metrics::aggregate_all(&canonical, &config.score_weights);
    let mut metrics_saved: u64 = 0;
    for metric in &rollups {
        let result = db
            .writer()
            .call({
                let metric = metric.clone();
                move |conn| {
                    repository::upsert_editor_minimal(conn, metric.editor_id, Some(&metric.editor_name))?;
                    repository::upsert_period_metric(conn, &metric)
                }
            })
            .await;
        match result {
            Ok(()) => metrics_saved += 1,
            Err(e) => {
                log::warn!(
                    "Failed to save metric {}/{}: {e}",
                    metric.editor_id,
                    metric.period_key
                );
                errors.push(format!(
                    "metric {}/{}/{}: {e}",
                    metric.editor_id,
                    metric.period_type.as_str(),
                    metric.period_key
                ));
            }
        }
    }

    let report = SyncReport::from_counts(canonical.len() as u64, tasks_saved, metrics_saved, errors);
    finish_job(db, job_id, &report).await?;
    progress.on_complete(&report);
    Ok(report)
}

async fn finish_job(db: &Database, job_id: i64, report: &SyncReport) -> Result<()> {
    let status = report.status.as_str().to_string();
    let (processed, saved, metrics_saved) =
        (report.tasks_processed, report.tasks_saved, report.metrics_saved);
    let error_count = report.errors.len() as u64;
    let error_message = if report.errors.is_empty() {
        None
    } else {
        Some(report.errors.join("; "))
    };
    db.writer()
        .call(move |conn| {
            repository::update_sync_job(
                conn,
                job_id,
                &status,
                processed,
                saved,
                metrics_saved,
                error_message.as_deref(),
                error_count,
            )
        })
        .await?;
    Ok(())
}
