pub mod types;

pub use types::EditorPeriodMetric;

use std::collections::HashMap;

use crate::config::ScoreWeights;
use crate::normalize::{ms_to_hours, CanonicalTask, TaskStatus};
use crate::period::{Period, PeriodType};

/// Aggregate canonical tasks into per-editor, per-bucket rollups for every
/// period type.
pub fn aggregate_all(tasks: &[CanonicalTask], weights: &ScoreWeights) -> Vec<EditorPeriodMetric> {
    let mut out = Vec::new();
    for period_type in [PeriodType::Week, PeriodType::Month, PeriodType::Quarter] {
        out.extend(aggregate(tasks, period_type, weights));
    }
    out
}

/// Group tasks by (editor, bucket) and compute rollups.
///
/// A task lands in the bucket containing its close date when present,
/// otherwise its creation date. Tasks without an editor or without any date
/// are skipped. For each editor, every bucket between the first and last
/// observed one is materialized, so trend lines have no holes; buckets with
/// zero completed tasks carry zero rates rather than being absent.
pub fn aggregate(
    tasks: &[CanonicalTask],
    period_type: PeriodType,
    weights: &ScoreWeights,
) -> Vec<EditorPeriodMetric> {
    let mut groups: HashMap<(i64, Period), Vec<&CanonicalTask>> = HashMap::new();
    let mut editor_names: HashMap<i64, String> = HashMap::new();

    for task in tasks {
        let Some(editor_id) = task.editor_id else {
            continue;
        };
        let Some(date) = task.bucket_date() else {
            continue;
        };
        let period = Period::from_date(period_type, date);
        groups.entry((editor_id, period)).or_default().push(task);
        if let Some(name) = &task.editor_name {
            editor_names.entry(editor_id).or_insert_with(|| name.clone());
        }
    }

    // Per-editor bucket span, for gap materialization
    let mut editor_periods: HashMap<i64, Vec<Period>> = HashMap::new();
    for (editor_id, period) in groups.keys() {
        editor_periods.entry(*editor_id).or_default().push(*period);
    }

    let empty: Vec<&CanonicalTask> = Vec::new();
    let mut metrics = Vec::new();
    for (editor_id, mut periods) in editor_periods {
        periods.sort_by_key(|p| p.date_range().0);
        let first = periods[0];
        let last = periods[periods.len() - 1];

        let editor_name = editor_names
            .get(&editor_id)
            .cloned()
            .unwrap_or_else(|| editor_id.to_string());

        let mut period = first;
        loop {
            let bucket_tasks = groups.get(&(editor_id, period)).unwrap_or(&empty);
            metrics.push(compute_metric(
                editor_id,
                &editor_name,
                period,
                bucket_tasks,
                weights,
            ));
            if period == last {
                break;
            }
            period = period.next();
        }
    }

    metrics.sort_by(|a, b| {
        a.editor_id
            .cmp(&b.editor_id)
            .then(a.period_start.cmp(&b.period_start))
    });
    metrics
}

fn compute_metric(
    editor_id: i64,
    editor_name: &str,
    period: Period,
    tasks: &[&CanonicalTask],
    weights: &ScoreWeights,
) -> EditorPeriodMetric {
    let (period_start, period_end) = period.date_range();

    let completed: Vec<&CanonicalTask> = tasks
        .iter()
        .copied()
        .filter(|t| t.status == TaskStatus::Completed)
        .collect();
    let total_videos = completed.len() as u64;

    // Alteration metrics only consider tasks that actually carry phase data;
    // tasks without it are excluded from the denominator, not treated as
    // zero-alteration.
    let with_phase: Vec<crate::phase::PhaseTime> = completed
        .iter()
        .filter_map(|t| t.phase_time)
        .collect();
    let videos_with_alteration = with_phase
        .iter()
        .filter(|p| p.alteration_ms > 0)
        .count() as u64;
    let alteration_rate = if with_phase.is_empty() {
        0.0
    } else {
        (videos_with_alteration as f64 / with_phase.len() as f64 * 100.0).round()
    };

    let total_editing_hours: f64 = with_phase.iter().map(|p| ms_to_hours(p.editing_ms)).sum();
    let positive_editing: Vec<f64> = with_phase
        .iter()
        .filter(|p| p.editing_ms > 0)
        .map(|p| ms_to_hours(p.editing_ms))
        .collect();
    let avg_editing_hours = if positive_editing.is_empty() {
        0.0
    } else {
        positive_editing.iter().sum::<f64>() / positive_editing.len() as f64
    };

    let editing_ms_sum: u64 = with_phase.iter().map(|p| p.editing_ms).sum();
    let revision_ms_sum: u64 = with_phase.iter().map(|p| p.revision_ms).sum();
    let revision_share_pct = if editing_ms_sum + revision_ms_sum == 0 {
        0.0
    } else {
        revision_ms_sum as f64 / (editing_ms_sum + revision_ms_sum) as f64 * 100.0
    };

    let (productivity_score, quality_score) = compute_scores(
        total_videos,
        avg_editing_hours,
        alteration_rate,
        revision_share_pct,
        weights,
    );

    EditorPeriodMetric {
        editor_id,
        editor_name: editor_name.to_string(),
        period_type: period.period_type(),
        period_key: period.to_key(),
        period_start,
        period_end,
        total_videos,
        videos_with_alteration,
        alteration_rate,
        total_editing_hours: round2(total_editing_hours),
        avg_editing_hours: round2(avg_editing_hours),
        productivity_score,
        quality_score,
    }
}

/// Weighted composites. Both scores are 0 for a bucket with no completed
/// videos; the speed component is 0 when there is no editing-time signal.
fn compute_scores(
    total_videos: u64,
    avg_editing_hours: f64,
    alteration_rate: f64,
    revision_share_pct: f64,
    weights: &ScoreWeights,
) -> (f64, f64) {
    if total_videos == 0 {
        return (0.0, 0.0);
    }

    let volume_factor = (total_videos as f64 / weights.volume_target).min(1.0);
    let speed_factor = if avg_editing_hours > 0.0 {
        (weights.speed_target_hours / avg_editing_hours).min(1.0)
    } else {
        0.0
    };
    let productivity =
        100.0 * (weights.volume_weight * volume_factor + weights.speed_weight * speed_factor);

    let quality = weights.alteration_weight * (100.0 - alteration_rate)
        + weights.revision_weight * (100.0 - revision_share_pct);

    (round2(productivity), round2(quality))
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::TaskStatus;
    use crate::phase::PhaseTime;

    fn task(
        id: &str,
        editor: i64,
        status: TaskStatus,
        closed_ms: Option<i64>,
        phase: Option<PhaseTime>,
    ) -> CanonicalTask {
        CanonicalTask {
            id: id.to_string(),
            title: id.to_string(),
            editor_id: Some(editor),
            editor_name: Some("Ana".to_string()),
            status,
            video_type: None,
            // 2025-08-04T00:00:00Z (a Monday)
            date_created_ms: Some(1754265600000),
            date_closed_ms: closed_ms,
            phase_time: phase,
            time_tracked_hours: 0.0,
        }
    }

    fn phase(editing_ms: u64, alteration_ms: u64) -> PhaseTime {
        PhaseTime {
            editing_ms,
            alteration_ms,
            total_ms: editing_ms + alteration_ms,
            ..Default::default()
        }
    }

    // Wednesday 2025-08-06T12:00:00Z
    const WEDNESDAY_MS: i64 = 1754481600000;

    #[test]
    fn test_week_scenario_alteration_rate() {
        let tasks = vec![
            task(
                "t1",
                42,
                TaskStatus::Completed,
                Some(WEDNESDAY_MS),
                Some(phase(3_600_000, 0)),
            ),
            task(
                "t2",
                42,
                TaskStatus::Completed,
                Some(WEDNESDAY_MS),
                Some(phase(7_200_000, 120_000)),
            ),
            task("t3", 42, TaskStatus::InProgress, None, None),
        ];

        let metrics = aggregate(&tasks, PeriodType::Week, &ScoreWeights::default());
        assert_eq!(metrics.len(), 1);
        let m = &metrics[0];
        assert_eq!(m.period_key, "2025-W32");
        assert_eq!(m.total_videos, 2);
        assert_eq!(m.videos_with_alteration, 1);
        assert_eq!(m.alteration_rate, 50.0);
        // avg over positive editing times: (1h + 2h) / 2
        assert!((m.avg_editing_hours - 1.5).abs() < 1e-9);
        assert!((m.total_editing_hours - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_tasks_without_phase_excluded_from_denominator() {
        let tasks = vec![
            task(
                "t1",
                42,
                TaskStatus::Completed,
                Some(WEDNESDAY_MS),
                Some(phase(3_600_000, 120_000)),
            ),
            // Completed but no phase data: counts in total_videos, not in the rate
            task("t2", 42, TaskStatus::Completed, Some(WEDNESDAY_MS), None),
        ];

        let metrics = aggregate(&tasks, PeriodType::Week, &ScoreWeights::default());
        let m = &metrics[0];
        assert_eq!(m.total_videos, 2);
        assert_eq!(m.videos_with_alteration, 1);
        assert_eq!(m.alteration_rate, 100.0);
    }

    #[test]
    fn test_bucket_with_no_completed_tasks_is_materialized() {
        let tasks = vec![task("t1", 42, TaskStatus::InProgress, None, None)];
        let metrics = aggregate(&tasks, PeriodType::Week, &ScoreWeights::default());
        assert_eq!(metrics.len(), 1);
        let m = &metrics[0];
        assert_eq!(m.total_videos, 0);
        assert_eq!(m.alteration_rate, 0.0);
        assert_eq!(m.productivity_score, 0.0);
        assert_eq!(m.quality_score, 0.0);
    }

    #[test]
    fn test_gap_weeks_filled_with_zero_rows() {
        // One task in W32, one in W34; W33 must exist with zeros
        let w32 = WEDNESDAY_MS;
        let w34 = WEDNESDAY_MS + 14 * 86_400_000;
        let tasks = vec![
            task("t1", 42, TaskStatus::Completed, Some(w32), Some(phase(1, 0))),
            task("t2", 42, TaskStatus::Completed, Some(w34), Some(phase(1, 0))),
        ];

        let metrics = aggregate(&tasks, PeriodType::Week, &ScoreWeights::default());
        let keys: Vec<&str> = metrics.iter().map(|m| m.period_key.as_str()).collect();
        assert_eq!(keys, vec!["2025-W32", "2025-W33", "2025-W34"]);
        assert_eq!(metrics[1].total_videos, 0);
    }

    #[test]
    fn test_monday_midnight_close_lands_in_that_week() {
        // 2025-08-04T00:00:00.000Z is Monday 00:00 exactly — W32, not W31
        let tasks = vec![task(
            "t1",
            42,
            TaskStatus::Completed,
            Some(1754265600000),
            Some(phase(1, 0)),
        )];
        let metrics = aggregate(&tasks, PeriodType::Week, &ScoreWeights::default());
        assert_eq!(metrics[0].period_key, "2025-W32");
    }

    #[test]
    fn test_editorless_tasks_skipped() {
        let mut t = task("t1", 42, TaskStatus::Completed, Some(WEDNESDAY_MS), None);
        t.editor_id = None;
        t.editor_name = None;
        let metrics = aggregate(&[t], PeriodType::Week, &ScoreWeights::default());
        assert!(metrics.is_empty());
    }

    #[test]
    fn test_alteration_rate_bounds() {
        for alt_count in 0..=4u64 {
            let tasks: Vec<CanonicalTask> = (0..4)
                .map(|i| {
                    let alt = if (i as u64) < alt_count { 60_000 } else { 0 };
                    task(
                        &format!("t{i}"),
                        42,
                        TaskStatus::Completed,
                        Some(WEDNESDAY_MS),
                        Some(phase(60_000, alt)),
                    )
                })
                .collect();
            let metrics = aggregate(&tasks, PeriodType::Week, &ScoreWeights::default());
            let rate = metrics[0].alteration_rate;
            assert!((0.0..=100.0).contains(&rate));
            assert_eq!(rate, (alt_count as f64 / 4.0 * 100.0).round());
        }
    }

    #[test]
    fn test_score_formulas() {
        let weights = ScoreWeights::default();

        // 5 videos at the 8h target speed: volume 0.5, speed 1.0
        let (prod, qual) = compute_scores(5, 8.0, 0.0, 0.0, &weights);
        assert!((prod - (100.0 * (0.6 * 0.5 + 0.4 * 1.0))).abs() < 1e-9);
        assert!((qual - 100.0).abs() < 1e-9);

        // Alteration rate 50, revision share 25
        let (_, qual) = compute_scores(5, 8.0, 50.0, 25.0, &weights);
        assert!((qual - (0.7 * 50.0 + 0.3 * 75.0)).abs() < 1e-9);

        // No editing signal: speed component is zero
        let (prod, _) = compute_scores(10, 0.0, 0.0, 0.0, &weights);
        assert!((prod - 60.0).abs() < 1e-9);

        // Empty bucket
        assert_eq!(compute_scores(0, 0.0, 0.0, 0.0, &weights), (0.0, 0.0));
    }

    #[test]
    fn test_aggregate_all_covers_three_period_types() {
        let tasks = vec![task(
            "t1",
            42,
            TaskStatus::Completed,
            Some(WEDNESDAY_MS),
            Some(phase(1, 0)),
        )];
        let metrics = aggregate_all(&tasks, &ScoreWeights::default());
        let keys: Vec<String> = metrics.iter().map(|m| m.period_key.clone()).collect();
        assert!(keys.contains(&"2025-W32".to_string()));
        assert!(keys.contains(&"2025-08".to_string()));
        assert!(keys.contains(&"2025-Q3".to_string()));
    }
}
