use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;

use crate::clickup::types::TimeInStatus;
use crate::clickup::Client;

/// Per-task elapsed time split across the named lifecycle phases.
///
/// `total_ms` accumulates every observed status interval, classified or not,
/// so it is not required to equal the sum of the named phases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseTime {
    pub editing_ms: u64,
    pub revision_ms: u64,
    pub alteration_ms: u64,
    pub approval_ms: u64,
    pub total_ms: u64,
}

impl PhaseTime {
    /// Whether this measurement carries a usable signal. Zero editing and
    /// zero revision time means the source saw nothing worth keeping and the
    /// precedence merge may fall through to the other source.
    pub fn has_signal(&self) -> bool {
        self.editing_ms > 0 || self.revision_ms > 0
    }

    fn add(&mut self, category: Option<PhaseCategory>, ms: u64) {
        self.total_ms += ms;
        match category {
            Some(PhaseCategory::Editing) => self.editing_ms += ms,
            Some(PhaseCategory::Revision) => self.revision_ms += ms,
            Some(PhaseCategory::Alteration) => self.alteration_ms += ms,
            Some(PhaseCategory::Approval) => self.approval_ms += ms,
            None => {}
        }
    }
}

/// The lifecycle phases that accumulate named time buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseCategory {
    Editing,
    Revision,
    Alteration,
    Approval,
}

const EDITING_KEYWORDS: &[&str] = &["editando"];
const REVISION_KEYWORDS: &[&str] = &["revisão", "revisando"];
const ALTERATION_KEYWORDS: &[&str] = &["alteração"];
const APPROVAL_KEYWORDS: &[&str] = &["aprovação", "aprovado"];

/// Classify a raw status name into a phase. Case-insensitive, first match
/// wins in the order editing → revision → alteration → approval. Status
/// names that match nothing still count toward `total_ms` only.
pub fn classify_status(status: &str) -> Option<PhaseCategory> {
    let lower = status.to_lowercase();
    let matches = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));
    if matches(EDITING_KEYWORDS) {
        Some(PhaseCategory::Editing)
    } else if matches(REVISION_KEYWORDS) {
        Some(PhaseCategory::Revision)
    } else if matches(ALTERATION_KEYWORDS) {
        Some(PhaseCategory::Alteration)
    } else if matches(APPROVAL_KEYWORDS) {
        Some(PhaseCategory::Approval)
    } else {
        None
    }
}

/// One status-transition event from the local append-only log, written by
/// the webhook receiver.
#[derive(Debug, Clone)]
pub struct StatusEvent {
    pub task_id: String,
    pub status: String,
    pub timestamp_ms: i64,
}

/// Where a task's phase measurement came from after the precedence merge.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseSource {
    History(PhaseTime),
    Remote(PhaseTime),
    None,
}

impl PhaseSource {
    /// Apply the precedence rule to one task's candidate measurements:
    /// history wins unless it carries no usable signal, in which case the
    /// remote value (when present) replaces it.
    pub fn pick(history: Option<PhaseTime>, remote: Option<PhaseTime>) -> Self {
        match (history, remote) {
            (Some(h), _) if h.has_signal() => PhaseSource::History(h),
            (Some(h), None) => PhaseSource::History(h),
            (_, Some(r)) => PhaseSource::Remote(r),
            (None, None) => PhaseSource::None,
        }
    }

    pub fn into_phase_time(self) -> Option<PhaseTime> {
        match self {
            PhaseSource::History(p) | PhaseSource::Remote(p) => Some(p),
            PhaseSource::None => None,
        }
    }
}

/// Pure precedence merge over the two candidate maps. Entries present in
/// only one source are preserved.
pub fn merge_phase_sources(
    history: HashMap<String, PhaseTime>,
    remote: HashMap<String, PhaseTime>,
) -> HashMap<String, PhaseTime> {
    let mut merged: HashMap<String, PhaseTime> = HashMap::new();
    let mut remote = remote;

    for (task_id, hist) in history {
        let rem = remote.remove(&task_id);
        if let Some(picked) = PhaseSource::pick(Some(hist), rem).into_phase_time() {
            merged.insert(task_id, picked);
        }
    }
    // Remote-only entries
    for (task_id, rem) in remote {
        merged.insert(task_id, rem);
    }
    merged
}

/// Derive a single task's phase time from its sorted status events.
///
/// Each closed interval between consecutive events is attributed to the
/// status active during it. The trailing interval after the last event is
/// not counted — a single-event history therefore yields no usable signal
/// and defers to the remote source in the merge.
pub fn from_history(events: &[StatusEvent]) -> PhaseTime {
    let mut phase = PhaseTime::default();
    for pair in events.windows(2) {
        let elapsed = (pair[1].timestamp_ms - pair[0].timestamp_ms).max(0) as u64;
        phase.add(classify_status(&pair[0].status), elapsed);
    }
    phase
}

/// Group a mixed event stream by task and derive phase times per task.
/// Events are sorted by timestamp within each task before pairing.
pub fn history_phase_times(events: Vec<StatusEvent>) -> HashMap<String, PhaseTime> {
    let mut by_task: HashMap<String, Vec<StatusEvent>> = HashMap::new();
    for event in events {
        by_task.entry(event.task_id.clone()).or_default().push(event);
    }

    let mut out = HashMap::new();
    for (task_id, mut task_events) in by_task {
        task_events.sort_by_key(|e| e.timestamp_ms);
        out.insert(task_id, from_history(&task_events));
    }
    out
}

/// Derive a phase time from the remote time-in-status payload. Durations
/// arrive as whole minutes per status name.
pub fn from_time_in_status(tis: &TimeInStatus) -> PhaseTime {
    let mut phase = PhaseTime::default();
    for entry in tis.entries() {
        let ms = entry.total_time.by_minute.max(0) as u64 * 60_000;
        phase.add(classify_status(&entry.status), ms);
    }
    phase
}

/// Resolve phase times for a set of tasks: the locally derived history map
/// is taken as given; tasks it cannot cover are fetched from the remote
/// time-in-status endpoint in fixed-size concurrent batches with a delay
/// between batches. A failed fetch degrades to "no data for this task".
pub async fn resolve_phase_times(
    client: &Client,
    task_ids: &[String],
    history: HashMap<String, PhaseTime>,
    batch_size: usize,
    batch_delay: Duration,
) -> HashMap<String, PhaseTime> {
    let need_remote: Vec<String> = task_ids
        .iter()
        .filter(|id| history.get(*id).is_none_or(|p| !p.has_signal()))
        .cloned()
        .collect();

    let mut remote: HashMap<String, PhaseTime> = HashMap::new();
    let batch_size = batch_size.max(1);
    let batch_count = need_remote.chunks(batch_size).count();

    for (i, batch) in need_remote.chunks(batch_size).enumerate() {
        let mut set = JoinSet::new();
        for task_id in batch {
            let client = client.clone();
            let task_id = task_id.clone();
            set.spawn(async move {
                match client.time_in_status(&task_id).await {
                    Ok(tis) => Some((task_id, from_time_in_status(&tis))),
                    Err(e) => {
                        log::warn!("Failed to fetch time in status for task {task_id}: {e}");
                        None
                    }
                }
            });
        }
        while let Some(joined) = set.join_next().await {
            if let Ok(Some((task_id, phase))) = joined {
                remote.insert(task_id, phase);
            }
        }
        if i + 1 < batch_count {
            tokio::time::sleep(batch_delay).await;
        }
    }

    merge_phase_sources(history, remote)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(task_id: &str, status: &str, ts: i64) -> StatusEvent {
        StatusEvent {
            task_id: task_id.to_string(),
            status: status.to_string(),
            timestamp_ms: ts,
        }
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(
            classify_status("VIDEO: EDITANDO"),
            Some(PhaseCategory::Editing)
        );
        assert_eq!(
            classify_status("em revisão"),
            Some(PhaseCategory::Revision)
        );
        assert_eq!(classify_status("REVISANDO"), Some(PhaseCategory::Revision));
        assert_eq!(
            classify_status("ALTERAÇÃO SOLICITADA"),
            Some(PhaseCategory::Alteration)
        );
        assert_eq!(
            classify_status("Aprovado ✔"),
            Some(PhaseCategory::Approval)
        );
        assert_eq!(classify_status("aberto"), None);
        assert_eq!(classify_status(""), None);
    }

    #[test]
    fn test_from_history_buckets_closed_intervals() {
        // EDITANDO for 60s, REVISÃO for 30s, then closed by APROVADO
        let events = vec![
            event("t1", "VIDEO: EDITANDO", 0),
            event("t1", "VIDEO: REVISÃO", 60_000),
            event("t1", "APROVADO", 90_000),
        ];
        let phase = from_history(&events);
        assert_eq!(phase.editing_ms, 60_000);
        assert_eq!(phase.revision_ms, 30_000);
        assert_eq!(phase.approval_ms, 0); // trailing interval not counted
        assert_eq!(phase.total_ms, 90_000);
    }

    #[test]
    fn test_from_history_single_event_has_no_signal() {
        let phase = from_history(&[event("t1", "VIDEO: EDITANDO", 0)]);
        assert_eq!(phase, PhaseTime::default());
        assert!(!phase.has_signal());
    }

    #[test]
    fn test_from_history_unclassified_status_counts_toward_total_only() {
        let events = vec![
            event("t1", "ABERTO", 0),
            event("t1", "VIDEO: EDITANDO", 120_000),
            event("t1", "APROVADO", 180_000),
        ];
        let phase = from_history(&events);
        assert_eq!(phase.editing_ms, 60_000);
        assert_eq!(phase.total_ms, 180_000);
    }

    #[test]
    fn test_history_phase_times_sorts_out_of_order_events() {
        let events = vec![
            event("t1", "VIDEO: REVISÃO", 60_000),
            event("t1", "VIDEO: EDITANDO", 0),
            event("t1", "APROVADO", 90_000),
            event("t2", "VIDEO: EDITANDO", 0),
        ];
        let map = history_phase_times(events);
        assert_eq!(map["t1"].editing_ms, 60_000);
        assert_eq!(map["t1"].revision_ms, 30_000);
        assert!(!map["t2"].has_signal());
    }

    #[test]
    fn test_from_time_in_status_minutes_to_ms() {
        let json = r#"{
            "status_history": [
                {"status": "VIDEO: EDITANDO", "total_time": {"by_minute": 30}},
                {"status": "ABERTO", "total_time": {"by_minute": 5}}
            ]
        }"#;
        let tis: TimeInStatus = serde_json::from_str(json).unwrap();
        let phase = from_time_in_status(&tis);
        assert_eq!(phase.editing_ms, 1_800_000);
        assert_eq!(phase.total_ms, 2_100_000);
    }

    #[test]
    fn test_merge_prefers_history_with_signal() {
        let hist_pt = PhaseTime {
            editing_ms: 10,
            ..Default::default()
        };
        let rem_pt = PhaseTime {
            editing_ms: 99,
            revision_ms: 99,
            ..Default::default()
        };
        let history = HashMap::from([("t1".to_string(), hist_pt)]);
        let remote = HashMap::from([("t1".to_string(), rem_pt)]);
        let merged = merge_phase_sources(history, remote);
        assert_eq!(merged["t1"], hist_pt);
    }

    #[test]
    fn test_merge_falls_back_to_remote_without_signal() {
        // History saw only alteration time — editing and revision both zero,
        // so the remote measurement replaces it wholesale.
        let hist_pt = PhaseTime {
            alteration_ms: 5_000,
            total_ms: 5_000,
            ..Default::default()
        };
        let rem_pt = PhaseTime {
            editing_ms: 1_800_000,
            total_ms: 1_800_000,
            ..Default::default()
        };
        let history = HashMap::from([("t1".to_string(), hist_pt)]);
        let remote = HashMap::from([("t1".to_string(), rem_pt)]);
        let merged = merge_phase_sources(history, remote);
        assert_eq!(merged["t1"], rem_pt);
    }

    #[test]
    fn test_merge_preserves_single_source_entries() {
        let hist_only = PhaseTime {
            alteration_ms: 5_000,
            ..Default::default()
        };
        let rem_only = PhaseTime {
            editing_ms: 60_000,
            ..Default::default()
        };
        let history = HashMap::from([("h".to_string(), hist_only)]);
        let remote = HashMap::from([("r".to_string(), rem_only)]);
        let merged = merge_phase_sources(history, remote);
        assert_eq!(merged.len(), 2);
        // No remote candidate: the weak history entry survives as-is
        assert_eq!(merged["h"], hist_only);
        assert_eq!(merged["r"], rem_only);
    }

    #[test]
    fn test_pick_source() {
        let weak = PhaseTime::default();
        let strong = PhaseTime {
            editing_ms: 1,
            ..Default::default()
        };
        assert_eq!(
            PhaseSource::pick(Some(strong), Some(weak)),
            PhaseSource::History(strong)
        );
        assert_eq!(
            PhaseSource::pick(Some(weak), Some(strong)),
            PhaseSource::Remote(strong)
        );
        assert_eq!(
            PhaseSource::pick(Some(weak), None),
            PhaseSource::History(weak)
        );
        assert_eq!(PhaseSource::pick(None, None), PhaseSource::None);
        assert_eq!(PhaseSource::None.into_phase_time(), None);
    }
}
