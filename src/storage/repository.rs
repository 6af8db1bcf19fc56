use rusqlite::{params, Connection, OptionalExtension};

use crate::metrics::EditorPeriodMetric;
use crate::normalize::CanonicalTask;
use crate::period::PeriodType;
use crate::phase::StatusEvent;

// ── Editors ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Editor {
    pub editor_id: i64,
    pub name: String,
    pub team_id: Option<String>,
    pub role: String,
    pub admission_date: Option<String>,
    pub is_active: bool,
}

pub fn upsert_editor(
    conn: &Connection,
    editor_id: i64,
    name: &str,
    team_id: Option<&str>,
    role: &str,
    admission_date: Option<&str>,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO editors (editor_id, name, team_id, role, admission_date, is_active, cached_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, datetime('now'))
         ON CONFLICT(editor_id) DO UPDATE SET
           name=excluded.name, team_id=excluded.team_id, role=excluded.role,
           admission_date=excluded.admission_date, cached_at=excluded.cached_at",
        params![editor_id, name, team_id, role, admission_date],
    )?;
    Ok(())
}

/// Minimal editor upsert — inserts if the editor doesn't exist, updates the
/// name only when the stored one is empty. Used by the sync pipeline when it
/// only knows an assignee id and username; registry fields stay untouched.
pub fn upsert_editor_minimal(
    conn: &Connection,
    editor_id: i64,
    name: Option<&str>,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO editors (editor_id, name, cached_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(editor_id) DO UPDATE SET
           name = CASE WHEN editors.name = '' AND excluded.name != ''
                       THEN excluded.name ELSE editors.name END",
        params![editor_id, name.unwrap_or("")],
    )?;
    Ok(())
}

pub fn list_editors(conn: &Connection) -> Result<Vec<Editor>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT editor_id, name, team_id, role, admission_date, is_active
         FROM editors ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Editor {
            editor_id: row.get(0)?,
            name: row.get(1)?,
            team_id: row.get(2)?,
            role: row.get(3)?,
            admission_date: row.get(4)?,
            is_active: row.get(5)?,
        })
    })?;
    rows.collect()
}

pub fn set_editor_active(
    conn: &Connection,
    editor_id: i64,
    is_active: bool,
) -> Result<bool, rusqlite::Error> {
    let count = conn.execute(
        "UPDATE editors SET is_active = ?2 WHERE editor_id = ?1",
        params![editor_id, is_active as i32],
    )?;
    Ok(count > 0)
}

// ── Task snapshots ─────────────────────────────────────────────────

pub fn upsert_task_snapshot(
    conn: &Connection,
    task: &CanonicalTask,
) -> Result<(), rusqlite::Error> {
    let phase = task.phase_time;
    conn.execute(
        "INSERT INTO task_snapshots (
            task_id, title, editor_id, editor_name, status, video_type,
            date_created_ms, date_closed_ms,
            editing_ms, revision_ms, alteration_ms, approval_ms, total_ms,
            time_tracked_hours, cached_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, datetime('now'))
        ON CONFLICT(task_id) DO UPDATE SET
            title=excluded.title, editor_id=excluded.editor_id,
            editor_name=excluded.editor_name, status=excluded.status,
            video_type=excluded.video_type,
            date_created_ms=excluded.date_created_ms,
            date_closed_ms=excluded.date_closed_ms,
            editing_ms=excluded.editing_ms, revision_ms=excluded.revision_ms,
            alteration_ms=excluded.alteration_ms, approval_ms=excluded.approval_ms,
            total_ms=excluded.total_ms,
            time_tracked_hours=excluded.time_tracked_hours,
            cached_at=excluded.cached_at",
        params![
            task.id,
            task.title,
            task.editor_id,
            task.editor_name,
            task.status.as_str(),
            task.video_type.map(|v| v.as_str()),
            task.date_created_ms,
            task.date_closed_ms,
            phase.map(|p| p.editing_ms as i64),
            phase.map(|p| p.revision_ms as i64),
            phase.map(|p| p.alteration_ms as i64),
            phase.map(|p| p.approval_ms as i64),
            phase.map(|p| p.total_ms as i64),
            task.time_tracked_hours,
        ],
    )?;
    Ok(())
}

/// (total, completed) snapshot counts, for the status command.
pub fn snapshot_counts(conn: &Connection) -> Result<(i64, i64), rusqlite::Error> {
    conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0)
         FROM task_snapshots",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
}

// ── Period metrics ─────────────────────────────────────────────────

pub fn upsert_period_metric(
    conn: &Connection,
    metric: &EditorPeriodMetric,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO editor_period_metrics (
            editor_id, period_type, period_key, editor_name,
            period_start, period_end,
            total_videos, videos_with_alteration, alteration_rate,
            total_editing_hours, avg_editing_hours,
            productivity_score, quality_score, computed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, datetime('now'))
        ON CONFLICT(editor_id, period_type, period_key) DO UPDATE SET
            editor_name=excluded.editor_name,
            period_start=excluded.period_start, period_end=excluded.period_end,
            total_videos=excluded.total_videos,
            videos_with_alteration=excluded.videos_with_alteration,
            alteration_rate=excluded.alteration_rate,
            total_editing_hours=excluded.total_editing_hours,
            avg_editing_hours=excluded.avg_editing_hours,
            productivity_score=excluded.productivity_score,
            quality_score=excluded.quality_score,
            computed_at=excluded.computed_at",
        params![
            metric.editor_id,
            metric.period_type.as_str(),
            metric.period_key,
            metric.editor_name,
            metric.period_start.format("%Y-%m-%d").to_string(),
            metric.period_end.format("%Y-%m-%d").to_string(),
            metric.total_videos as i64,
            metric.videos_with_alteration as i64,
            metric.alteration_rate,
            metric.total_editing_hours,
            metric.avg_editing_hours,
            metric.productivity_score,
            metric.quality_score,
        ],
    )?;
    Ok(())
}

fn metric_from_row(row: &rusqlite::Row<'_>) -> Result<EditorPeriodMetric, rusqlite::Error> {
    let period_type_str: String = row.get(1)?;
    let period_type = PeriodType::parse(&period_type_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let start_str: String = row.get(4)?;
    let end_str: String = row.get(5)?;

    Ok(EditorPeriodMetric {
        editor_id: row.get(0)?,
        period_type,
        period_key: row.get(2)?,
        editor_name: row.get(3)?,
        period_start: chrono::NaiveDate::parse_from_str(&start_str, "%Y-%m-%d")
            .unwrap_or_default(),
        period_end: chrono::NaiveDate::parse_from_str(&end_str, "%Y-%m-%d").unwrap_or_default(),
        total_videos: row.get::<_, i64>(6)? as u64,
        videos_with_alteration: row.get::<_, i64>(7)? as u64,
        alteration_rate: row.get(8)?,
        total_editing_hours: row.get(9)?,
        avg_editing_hours: row.get(10)?,
        productivity_score: row.get(11)?,
        quality_score: row.get(12)?,
    })
}

const METRIC_COLUMNS: &str = "editor_id, period_type, period_key, editor_name, \
     period_start, period_end, total_videos, videos_with_alteration, alteration_rate, \
     total_editing_hours, avg_editing_hours, productivity_score, quality_score";

pub fn get_period_metric(
    conn: &Connection,
    editor_id: i64,
    period_type: PeriodType,
    period_key: &str,
) -> Result<Option<EditorPeriodMetric>, rusqlite::Error> {
    conn.query_row(
        &format!(
            "SELECT {METRIC_COLUMNS} FROM editor_period_metrics
             WHERE editor_id = ?1 AND period_type = ?2 AND period_key = ?3"
        ),
        params![editor_id, period_type.as_str(), period_key],
        metric_from_row,
    )
    .optional()
}

/// All editors' rows for one period, best productivity first.
pub fn list_period_metrics(
    conn: &Connection,
    period_type: PeriodType,
    period_key: &str,
) -> Result<Vec<EditorPeriodMetric>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {METRIC_COLUMNS} FROM editor_period_metrics
         WHERE period_type = ?1 AND period_key = ?2
         ORDER BY productivity_score DESC, editor_name"
    ))?;
    let rows = stmt.query_map(params![period_type.as_str(), period_key], metric_from_row)?;
    rows.collect()
}

/// One editor's most recent rows of a period type, newest first.
pub fn list_editor_metrics(
    conn: &Connection,
    editor_id: i64,
    period_type: PeriodType,
    limit: u32,
) -> Result<Vec<EditorPeriodMetric>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {METRIC_COLUMNS} FROM editor_period_metrics
         WHERE editor_id = ?1 AND period_type = ?2
         ORDER BY period_start DESC LIMIT ?3"
    ))?;
    let rows = stmt.query_map(
        params![editor_id, period_type.as_str(), limit],
        metric_from_row,
    )?;
    rows.collect()
}

// ── Status events ──────────────────────────────────────────────────

pub fn insert_status_event(
    conn: &Connection,
    task_id: &str,
    status: &str,
    timestamp_ms: i64,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO status_events (task_id, status, timestamp_ms) VALUES (?1, ?2, ?3)",
        params![task_id, status, timestamp_ms],
    )?;
    Ok(())
}

/// Fetch all logged status events for the given tasks, ordered by task and
/// time so the resolver can pair consecutive events directly.
pub fn status_events_for_tasks(
    conn: &Connection,
    task_ids: &[String],
) -> Result<Vec<StatusEvent>, rusqlite::Error> {
    if task_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = task_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!(
        "SELECT task_id, status, timestamp_ms FROM status_events
         WHERE task_id IN ({placeholders})
         ORDER BY task_id, timestamp_ms"
    );
    let mut stmt = conn.prepare(&sql)?;
    for (i, task_id) in task_ids.iter().enumerate() {
        stmt.raw_bind_parameter(i + 1, task_id)?;
    }

    let mut events = Vec::new();
    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        events.push(StatusEvent {
            task_id: row.get(0)?,
            status: row.get(1)?,
            timestamp_ms: row.get(2)?,
        });
    }
    Ok(events)
}

// ── Config ─────────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

// ── Sync jobs ──────────────────────────────────────────────────────

pub fn insert_sync_job(conn: &Connection) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO sync_jobs (status, started_at) VALUES ('running', datetime('now'))",
        [],
    )?;
    Ok(conn.last_insert_rowid())
}

#[allow(clippy::too_many_arguments)]
pub fn update_sync_job(
    conn: &Connection,
    job_id: i64,
    status: &str,
    tasks_processed: u64,
    tasks_saved: u64,
    metrics_saved: u64,
    error_message: Option<&str>,
    error_count: u64,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "UPDATE sync_jobs SET
            status = ?2, completed_at = datetime('now'),
            tasks_processed = ?3, tasks_saved = ?4, metrics_saved = ?5,
            error_count = ?6, error_message = ?7
         WHERE id = ?1",
        params![
            job_id,
            status,
            tasks_processed as i64,
            tasks_saved as i64,
            metrics_saved as i64,
            error_count as i64,
            error_message,
        ],
    )?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SyncJobRow {
    pub id: i64,
    pub status: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub tasks_processed: i64,
    pub tasks_saved: i64,
    pub metrics_saved: i64,
    pub error_count: i64,
}

pub fn last_sync_job(conn: &Connection) -> Result<Option<SyncJobRow>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, status, started_at, completed_at,
                tasks_processed, tasks_saved, metrics_saved, error_count
         FROM sync_jobs ORDER BY id DESC LIMIT 1",
        [],
        |row| {
            Ok(SyncJobRow {
                id: row.get(0)?,
                status: row.get(1)?,
                started_at: row.get(2)?,
                completed_at: row.get(3)?,
                tasks_processed: row.get(4)?,
                tasks_saved: row.get(5)?,
                metrics_saved: row.get(6)?,
                error_count: row.get(7)?,
            })
        },
    )
    .optional()
}
