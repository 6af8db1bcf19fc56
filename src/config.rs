use std::collections::HashSet;

/// Everything a sync run needs to know, constructed explicitly by the caller
/// (CLI flags / env vars) and threaded through the pipeline. No ambient
/// globals — multiple runs with different configs can coexist in one process.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// ClickUp personal API token. `None` means the source is not configured.
    pub api_token: Option<String>,
    /// List ids to pull tasks from.
    pub list_ids: Vec<String>,
    /// Assignee ids stripped from every task (bot/test accounts).
    pub excluded_user_ids: HashSet<i64>,
    /// Editor ids that count as team members for the retention filter.
    pub team_member_ids: HashSet<i64>,
    /// Tag that marks a task as belonging to the team regardless of assignees.
    pub team_tag: String,
    /// Server-side creation-date lower bound, as days before now.
    pub lookback_days: u32,
    /// Hard ceiling on pages fetched per list.
    pub max_pages_per_list: u32,
    /// Number of concurrent time-in-status fetches per batch.
    pub phase_batch_size: usize,
    /// Delay between phase-resolver batches.
    pub phase_batch_delay_ms: u64,
    /// Weights for the composite scores.
    pub score_weights: ScoreWeights,
    /// Max age for cached per-task feedback counts, in seconds.
    pub feedback_cache_max_age_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            list_ids: Vec::new(),
            excluded_user_ids: HashSet::new(),
            team_member_ids: HashSet::new(),
            team_tag: "audiovisual".to_string(),
            lookback_days: 90,
            max_pages_per_list: 20,
            phase_batch_size: 5,
            phase_batch_delay_ms: 1000,
            score_weights: ScoreWeights::default(),
            feedback_cache_max_age_secs: 15 * 60,
        }
    }
}

impl SyncConfig {
    /// True when both a credential and at least one list id are present.
    pub fn is_configured(&self) -> bool {
        self.api_token.as_deref().is_some_and(|t| !t.trim().is_empty())
            && !self.list_ids.is_empty()
    }
}

/// Parse a list-id string separated by newlines, commas, or whitespace.
/// Empty segments are dropped; order is preserved.
pub fn parse_list_ids(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a set of numeric user ids from the same delimiter-tolerant format.
/// Non-numeric segments are skipped with a log line rather than failing the
/// whole configuration.
pub fn parse_id_set(raw: &str) -> HashSet<i64> {
    let mut out = HashSet::new();
    for seg in parse_list_ids(raw) {
        match seg.parse::<i64>() {
            Ok(id) => {
                out.insert(id);
            }
            Err(_) => log::warn!("Ignoring non-numeric user id in config: {seg:?}"),
        }
    }
    out
}

/// Weights for the productivity/quality composites. A policy choice, not
/// physics — changing these changes scores everywhere, so they are pinned
/// here and documented rather than scattered as literals.
#[derive(Debug, Clone)]
pub struct ScoreWeights {
    /// Share of the productivity score driven by completed volume.
    pub volume_weight: f64,
    /// Share of the productivity score driven by editing speed.
    pub speed_weight: f64,
    /// Completed videos per period that count as a full volume score.
    pub volume_target: f64,
    /// Average editing hours at or below which speed scores full marks.
    pub speed_target_hours: f64,
    /// Share of the quality score driven by the alteration rate.
    pub alteration_weight: f64,
    /// Share of the quality score driven by the revision time share.
    pub revision_weight: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            volume_weight: 0.6,
            speed_weight: 0.4,
            volume_target: 10.0,
            speed_target_hours: 8.0,
            alteration_weight: 0.7,
            revision_weight: 0.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_ids_delimiters() {
        assert_eq!(parse_list_ids("123,456"), vec!["123", "456"]);
        assert_eq!(parse_list_ids("123\n456\n789"), vec!["123", "456", "789"]);
        assert_eq!(parse_list_ids("123 456\t789"), vec!["123", "456", "789"]);
        assert_eq!(parse_list_ids(" 123 ,\n 456 ,, "), vec!["123", "456"]);
        assert!(parse_list_ids("").is_empty());
        assert!(parse_list_ids(" \n, ").is_empty());
    }

    #[test]
    fn test_parse_id_set() {
        let set = parse_id_set("999, 42\n7");
        assert_eq!(set.len(), 3);
        assert!(set.contains(&999));
        assert!(set.contains(&42));
        assert!(set.contains(&7));

        // Junk segments are skipped, numeric ones kept
        let set = parse_id_set("abc, 5");
        assert_eq!(set.len(), 1);
        assert!(set.contains(&5));
    }

    #[test]
    fn test_is_configured() {
        let mut cfg = SyncConfig::default();
        assert!(!cfg.is_configured());

        cfg.api_token = Some("pk_token".into());
        assert!(!cfg.is_configured());

        cfg.list_ids = vec!["123".into()];
        assert!(cfg.is_configured());

        cfg.api_token = Some("   ".into());
        assert!(!cfg.is_configured());
    }
}
