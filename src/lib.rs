pub mod clickup;
pub mod config;
pub mod date_util;
pub mod error;
pub mod feedback;
pub mod metrics;
pub mod normalize;
pub mod period;
pub mod phase;
pub mod storage;
pub mod sync;
pub mod url;

pub use config::{ScoreWeights, SyncConfig};
pub use error::{Error, Result};
pub use feedback::{CommentCategory, CommentClassifier, FeedbackCounts, KeywordClassifier};
pub use metrics::EditorPeriodMetric;
pub use normalize::{CanonicalTask, TaskStatus, VideoType};
pub use period::{Period, PeriodType};
pub use phase::PhaseTime;
pub use storage::Database;
pub use sync::{NoopProgress, SyncOptions, SyncProgress, SyncReport, SyncStatus};
pub use url::{parse_clickup_url, resolve_task_id, ClickUpUrlInfo};

// Re-export repository types needed by the binary crate, but not the module itself
pub use storage::repository::{Editor, SyncJobRow};

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use storage::repository;
use sync::syncer;

/// Main entry point for the editor data warehouse.
///
/// Owns the database, the optional API client (absent when no token is
/// configured), the sync configuration, and the feedback cache. Constructed
/// explicitly so multiple instances with different configs can coexist in
/// one process.
pub struct EditorDW {
    db: Database,
    client: Option<clickup::Client>,
    config: SyncConfig,
    classifier: KeywordClassifier,
    feedback_cache: Mutex<feedback::FeedbackCache>,
}

impl EditorDW {
    pub fn new(db: Database, config: SyncConfig) -> Result<Self> {
        let client = match config.api_token.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(token) => Some(clickup::Client::new(token)?),
            None => None,
        };
        let cache = feedback::FeedbackCache::new(Duration::from_secs(
            config.feedback_cache_max_age_secs,
        ));
        Ok(Self {
            db,
            client,
            config,
            classifier: KeywordClassifier,
            feedback_cache: Mutex::new(cache),
        })
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // ── Sync ───────────────────────────────────────────────────────

    /// Run the full pipeline and return its report.
    pub async fn sync(
        &self,
        options: &SyncOptions,
        progress: &dyn SyncProgress,
    ) -> Result<SyncReport> {
        syncer::run_sync(
            &self.db,
            self.client.as_ref(),
            &self.config,
            options,
            progress,
        )
        .await
    }

    // ── Single-task inspection ─────────────────────────────────────

    /// Resolve one task's phase time through both strategies (local history
    /// first, remote fallback). Accepts a task id or a ClickUp task URL.
    pub async fn phase_for_task(&self, identifier: &str) -> Result<Option<PhaseTime>> {
        let task_id = url::resolve_task_id(identifier)?;
        let client = self.require_client()?;

        let events = self
            .db
            .reader()
            .call({
                let ids = vec![task_id.clone()];
                move |conn| repository::status_events_for_tasks(conn, &ids)
            })
            .await?;
        let history = phase::history_phase_times(events);

        let merged = phase::resolve_phase_times(
            client,
            std::slice::from_ref(&task_id),
            history,
            1,
            Duration::ZERO,
        )
        .await;
        Ok(merged.get(&task_id).copied())
    }

    /// Fetch and categorize one task's review comments. Results are memoized
    /// in the feedback cache until they age out.
    pub async fn feedback_for_task(&self, identifier: &str) -> Result<FeedbackCounts> {
        let task_id = url::resolve_task_id(identifier)?;

        {
            let cache = self
                .feedback_cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(counts) = cache.get(&task_id) {
                return Ok(counts);
            }
        }

        let client = self.require_client()?;
        let comments = client.task_comments(&task_id).await?;
        let counts = feedback::count_categories(
            comments.iter().map(|c| c.comment_text.as_str()),
            &self.classifier,
        );

        let mut cache = self
            .feedback_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        cache.insert(&task_id, counts.clone());
        Ok(counts)
    }

    /// Append a status-transition event to the local history log. Called by
    /// whatever process receives tracker webhooks.
    pub async fn record_status_event(
        &self,
        task_id: &str,
        status: &str,
        timestamp_ms: i64,
    ) -> Result<()> {
        self.db
            .writer()
            .call({
                let task_id = task_id.to_string();
                let status = status.to_string();
                move |conn| repository::insert_status_event(conn, &task_id, &status, timestamp_ms)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    // ── Metrics reads ──────────────────────────────────────────────

    pub async fn metrics_for_editor(
        &self,
        editor_id: i64,
        period: Period,
    ) -> Result<Option<EditorPeriodMetric>> {
        self.db
            .reader()
            .call(move |conn| {
                repository::get_period_metric(
                    conn,
                    editor_id,
                    period.period_type(),
                    &period.to_key(),
                )
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// All editors' rollups for one period, best productivity first.
    pub async fn metrics_for_period(&self, period: Period) -> Result<Vec<EditorPeriodMetric>> {
        self.db
            .reader()
            .call(move |conn| {
                repository::list_period_metrics(conn, period.period_type(), &period.to_key())
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// One editor's most recent buckets of a period type, newest first.
    pub async fn metrics_trend(
        &self,
        editor_id: i64,
        period_type: PeriodType,
        limit: u32,
    ) -> Result<Vec<EditorPeriodMetric>> {
        self.db
            .reader()
            .call(move |conn| repository::list_editor_metrics(conn, editor_id, period_type, limit))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    // ── Editor registry ────────────────────────────────────────────

    pub async fn editor_add(
        &self,
        editor_id: i64,
        name: &str,
        team_id: Option<&str>,
        role: &str,
        admission_date: Option<&str>,
    ) -> Result<()> {
        self.db
            .writer()
            .call({
                let name = name.to_string();
                let team_id = team_id.map(str::to_string);
                let role = role.to_string();
                let admission_date = admission_date.map(str::to_string);
                move |conn| {
                    repository::upsert_editor(
                        conn,
                        editor_id,
                        &name,
                        team_id.as_deref(),
                        &role,
                        admission_date.as_deref(),
                    )
                }
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn editor_list(&self) -> Result<Vec<Editor>> {
        self.db
            .reader()
            .call(|conn| repository::list_editors(conn))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn editor_set_active(&self, editor_id: i64, active: bool) -> Result<bool> {
        self.db
            .writer()
            .call(move |conn| repository::set_editor_active(conn, editor_id, active))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    // ── Config ─────────────────────────────────────────────────────

    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        self.db
            .reader()
            .call({
                let key = key.to_string();
                move |conn| repository::get_config(conn, &key)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .writer()
            .call({
                let key = key.to_string();
                let value = value.to_string();
                move |conn| repository::set_config(conn, &key, &value)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn config_list(&self) -> Result<Vec<(String, String)>> {
        self.db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    // ── Status ─────────────────────────────────────────────────────

    /// Warehouse summary: (total snapshots, completed snapshots, editors,
    /// last sync job).
    pub async fn status_summary(
        &self,
    ) -> Result<(i64, i64, usize, Option<SyncJobRow>)> {
        self.db
            .reader()
            .call(|conn| {
                let (total, completed) = repository::snapshot_counts(conn)?;
                let editors = repository::list_editors(conn)?.len();
                let last_job = repository::last_sync_job(conn)?;
                Ok::<_, rusqlite::Error>((total, completed, editors, last_job))
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    fn require_client(&self) -> Result<&clickup::Client> {
        self.client
            .as_ref()
            .ok_or_else(|| Error::Config("no ClickUp API token configured".into()))
    }
}
