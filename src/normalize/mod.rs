use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::clickup::types::RawTask;
use crate::date_util::date_from_ms;
use crate::phase::PhaseTime;

/// Normalized lifecycle state. Unrecognized raw statuses map to `Other`
/// rather than erroring — `normalize_status` is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Completed,
    InProgress,
    InReview,
    Alteration,
    Pending,
    Open,
    Other,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Completed => "completed",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::InReview => "in_review",
            TaskStatus::Alteration => "alteration",
            TaskStatus::Pending => "pending",
            TaskStatus::Open => "open",
            TaskStatus::Other => "other",
        }
    }

    /// Inverse of `as_str`, for reading snapshots back from storage.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "completed" => TaskStatus::Completed,
            "in_progress" => TaskStatus::InProgress,
            "in_review" => TaskStatus::InReview,
            "alteration" => TaskStatus::Alteration,
            "pending" => TaskStatus::Pending,
            "open" => TaskStatus::Open,
            _ => TaskStatus::Other,
        }
    }
}

/// Map a raw status name to the fixed taxonomy. Case-insensitive substring
/// matching against a priority-ordered table; the first match wins.
pub fn normalize_status(raw: &str) -> TaskStatus {
    let lower = raw.to_lowercase();
    let matches = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if matches(&["aprovado", "conclu"]) {
        TaskStatus::Completed
    } else if matches(&["editando"]) {
        TaskStatus::InProgress
    } else if matches(&["revisão", "revisando"]) {
        TaskStatus::InReview
    } else if matches(&["alteração"]) {
        TaskStatus::Alteration
    } else if matches(&["aguardando", "pendente"]) {
        TaskStatus::Pending
    } else if matches(&["open", "aberto"]) {
        TaskStatus::Open
    } else {
        TaskStatus::Other
    }
}

/// Video deliverable categories, derived from task tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoType {
    Vsl,
    Funil,
    Ads,
    Thumbnail,
    Mic,
    Lead,
    Reels,
    Shorts,
    Corte,
}

impl VideoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoType::Vsl => "vsl",
            VideoType::Funil => "funil",
            VideoType::Ads => "ads",
            VideoType::Thumbnail => "thumbnail",
            VideoType::Mic => "mic",
            VideoType::Lead => "lead",
            VideoType::Reels => "reels",
            VideoType::Shorts => "shorts",
            VideoType::Corte => "corte",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "vsl" => Some(VideoType::Vsl),
            "funil" => Some(VideoType::Funil),
            "ads" => Some(VideoType::Ads),
            "thumbnail" => Some(VideoType::Thumbnail),
            "mic" => Some(VideoType::Mic),
            "lead" => Some(VideoType::Lead),
            "reels" => Some(VideoType::Reels),
            "shorts" => Some(VideoType::Shorts),
            "corte" => Some(VideoType::Corte),
            _ => None,
        }
    }
}

/// Tag keyword → category table. Keywords compare by exact match on the
/// lowercased tag name; a substring match would let short keywords like
/// "ad" or "tp" swallow unrelated tags.
const VIDEO_TYPE_KEYWORDS: &[(&str, VideoType)] = &[
    ("vsl", VideoType::Vsl),
    ("funil", VideoType::Funil),
    ("ads", VideoType::Ads),
    ("ad", VideoType::Ads),
    ("thumbnail", VideoType::Thumbnail),
    ("tp", VideoType::Thumbnail),
    ("mic", VideoType::Mic),
    ("lead", VideoType::Lead),
    ("reels", VideoType::Reels),
    ("shorts", VideoType::Shorts),
    ("corte", VideoType::Corte),
];

/// Derive the video type from task tags. The first tag (in tag order) that
/// matches any keyword wins; no match yields `None`. Total, never panics.
pub fn video_type_for(task: &RawTask) -> Option<VideoType> {
    for tag in &task.tags {
        let lower = tag.name.trim().to_lowercase();
        for (keyword, video_type) in VIDEO_TYPE_KEYWORDS {
            if lower == *keyword {
                return Some(*video_type);
            }
        }
    }
    None
}

/// A task after normalization: fixed status taxonomy, resolved editor,
/// attached phase time. Built once per sync cycle, in memory only; the
/// durable `task_snapshots` row is derived from this.
#[derive(Debug, Clone, Serialize)]
pub struct CanonicalTask {
    pub id: String,
    pub title: String,
    /// First remaining assignee after exclusion filtering; `None` when no
    /// assignee survived. Editor-less tasks stay in the list but are skipped
    /// by per-editor aggregation.
    pub editor_id: Option<i64>,
    pub editor_name: Option<String>,
    pub status: TaskStatus,
    pub video_type: Option<VideoType>,
    pub date_created_ms: Option<i64>,
    pub date_closed_ms: Option<i64>,
    /// Absent means "no data", which downstream aggregation treats
    /// differently from zero time.
    pub phase_time: Option<PhaseTime>,
    pub time_tracked_hours: f64,
}

impl CanonicalTask {
    /// The date used for time-bucketing: close date when present, otherwise
    /// creation date. UTC reference.
    pub fn bucket_date(&self) -> Option<NaiveDate> {
        self.date_closed_ms
            .or(self.date_created_ms)
            .and_then(date_from_ms)
    }
}

pub fn ms_to_hours(ms: u64) -> f64 {
    ms as f64 / 3_600_000.0
}

/// Combine raw tasks with resolved phase times into canonical records.
/// Pure transformation, no I/O.
pub fn normalize_tasks(
    raw_tasks: &[RawTask],
    phase_times: &HashMap<String, PhaseTime>,
) -> Vec<CanonicalTask> {
    raw_tasks
        .iter()
        .map(|task| normalize_task(task, phase_times.get(&task.id).copied()))
        .collect()
}

fn normalize_task(task: &RawTask, phase_time: Option<PhaseTime>) -> CanonicalTask {
    let editor = task.assignees.first();

    let time_tracked_hours = match (&phase_time, task.time_spent) {
        (Some(phase), _) => ms_to_hours(phase.total_ms),
        (None, Some(spent)) => ms_to_hours(spent.max(0) as u64),
        (None, None) => 0.0,
    };

    CanonicalTask {
        id: task.id.clone(),
        title: task.name.clone(),
        editor_id: editor.map(|a| a.id),
        editor_name: editor.map(|a| a.username.clone()),
        status: normalize_status(&task.status.status),
        video_type: video_type_for(task),
        date_created_ms: task.created_ms(),
        date_closed_ms: task.closed_ms(),
        phase_time,
        time_tracked_hours,
    }
}
