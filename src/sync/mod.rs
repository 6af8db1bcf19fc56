pub mod rate_limit;
pub mod source;
pub mod syncer;

use chrono::NaiveDate;
use serde::Serialize;

/// Options controlling a sync operation.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub since: Option<NaiveDate>,
    pub days: Option<u32>,
}

impl SyncOptions {
    /// The creation-date lower bound for this run, falling back to the
    /// configured lookback when no override was given.
    pub fn since_date(&self, default_lookback_days: u32) -> NaiveDate {
        if let Some(d) = self.since {
            d
        } else {
            let days = self.days.unwrap_or(default_lookback_days);
            chrono::Utc::now().date_naive() - chrono::Duration::days(days as i64)
        }
    }

    /// Same bound as epoch milliseconds, for the `date_created_gt` filter.
    pub fn since_ms(&self, default_lookback_days: u32) -> i64 {
        self.since_date(default_lookback_days)
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or(0)
    }
}

/// Report returned after a sync run completes. Partial progress is the
/// normal case: counts plus an error list, never all-or-nothing.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub status: SyncStatus,
    pub tasks_processed: u64,
    pub tasks_saved: u64,
    pub metrics_saved: u64,
    pub errors: Vec<String>,
}

impl SyncReport {
    /// Create a SyncReport with the status derived from counts.
    pub fn from_counts(
        tasks_processed: u64,
        tasks_saved: u64,
        metrics_saved: u64,
        errors: Vec<String>,
    ) -> Self {
        let status = if errors.is_empty() {
            SyncStatus::Success
        } else if tasks_saved > 0 || metrics_saved > 0 {
            SyncStatus::PartialFailure
        } else {
            SyncStatus::Failed
        };
        Self {
            status,
            tasks_processed,
            tasks_saved,
            metrics_saved,
            errors,
        }
    }

    /// A run that never started because the source is not configured.
    /// Distinguishable from "configured but genuinely empty", which reports
    /// `Success` with zero counts.
    pub fn not_configured(reason: String) -> Self {
        Self {
            status: SyncStatus::NotConfigured,
            tasks_processed: 0,
            tasks_saved: 0,
            metrics_saved: 0,
            errors: vec![reason],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SyncStatus {
    Success,
    PartialFailure,
    Failed,
    NotConfigured,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "completed",
            SyncStatus::PartialFailure => "partial_failure",
            SyncStatus::Failed => "failed",
            SyncStatus::NotConfigured => "not_configured",
        }
    }
}

/// Observer for sync progress, implemented by the CLI to draw to stderr.
pub trait SyncProgress: Send + Sync {
    fn on_list_start(&self, _list_id: &str, _index: usize, _total: usize) {}
    fn on_tasks_fetched(&self, _count: usize) {}
    fn on_phase_resolved(&self, _count: usize) {}
    fn on_complete(&self, _report: &SyncReport) {}
}

/// Progress reporter that does nothing (library callers, tests).
pub struct NoopProgress;

impl SyncProgress for NoopProgress {}
