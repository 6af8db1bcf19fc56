use chrono::NaiveDate;
use serde::Serialize;

use crate::period::PeriodType;

/// Per-editor rollup for one time bucket. Recomputed and upserted on every
/// sync; the natural key is (editor_id, period_type, period_key) and a later
/// write fully replaces the numeric fields.
#[derive(Debug, Clone, Serialize)]
pub struct EditorPeriodMetric {
    pub editor_id: i64,
    pub editor_name: String,
    pub period_type: PeriodType,
    pub period_key: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Completed videos in the bucket.
    pub total_videos: u64,
    /// Completed, phase-data-bearing videos with alteration time.
    pub videos_with_alteration: u64,
    /// 0–100, rounded; denominator is the phase-data-bearing completed
    /// subset, 0 when that subset is empty.
    pub alteration_rate: f64,
    pub total_editing_hours: f64,
    /// Mean over completed videos with positive editing time.
    pub avg_editing_hours: f64,
    pub productivity_score: f64,
    pub quality_score: f64,
}
