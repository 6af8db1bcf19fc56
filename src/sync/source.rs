use crate::clickup::types::RawTask;
use crate::clickup::Client;
use crate::config::SyncConfig;
use crate::sync::rate_limit::retry_api;
use crate::sync::{SyncOptions, SyncProgress};

/// What a fetch produced. "Not configured" and "configured but empty" look
/// identical as a bare task list, so the distinction is carried explicitly
/// and callers decide how loudly to surface it.
#[derive(Debug)]
pub enum FetchOutcome {
    NotConfigured { reason: String },
    Fetched(Vec<RawTask>),
}

/// Fetch tasks from every configured list, then apply the client-side team
/// filters.
///
/// Pages within one list are sequential; a non-OK page is logged and treated
/// as end-of-pages for that list without touching the others. The page
/// ceiling bounds worst-case latency per list.
pub async fn fetch_tasks(
    client: Option<&Client>,
    config: &SyncConfig,
    options: &SyncOptions,
    progress: &dyn SyncProgress,
) -> FetchOutcome {
    let Some(client) = client else {
        return FetchOutcome::NotConfigured {
            reason: "no ClickUp API token configured (set CLICKUP_TOKEN)".to_string(),
        };
    };
    if config.list_ids.is_empty() {
        return FetchOutcome::NotConfigured {
            reason: "no ClickUp list ids configured (set CLICKUP_LIST_IDS)".to_string(),
        };
    }

    let since_ms = options.since_ms(config.lookback_days);
    let mut all_tasks: Vec<RawTask> = Vec::new();
    let list_total = config.list_ids.len();

    for (index, list_id) in config.list_ids.iter().enumerate() {
        progress.on_list_start(list_id, index, list_total);

        for page in 0..config.max_pages_per_list {
            let fetched = retry_api!(client.list_tasks_page(list_id, page, Some(since_ms)));
            let page_data = match fetched {
                Ok(p) => p,
                Err(e) => {
                    log::warn!("Failed to fetch page {page} of list {list_id}: {e}");
                    break;
                }
            };

            if page_data.tasks.is_empty() {
                break;
            }
            let is_last = page_data.last_page == Some(true);
            all_tasks.extend(page_data.tasks);
            if is_last {
                break;
            }
            if page + 1 == config.max_pages_per_list {
                log::warn!(
                    "List {list_id} hit the page ceiling ({}); raise max_pages_per_list if \
                     this is expected",
                    config.max_pages_per_list
                );
            }
        }
    }

    FetchOutcome::Fetched(apply_filters(all_tasks, config))
}

/// Client-side filters, applied in sequence:
/// 1. strip excluded assignees (bot/test accounts) from every task;
/// 2. keep tasks carrying the team tag OR with at least one remaining
///    assignee in the team-membership set.
pub fn apply_filters(tasks: Vec<RawTask>, config: &SyncConfig) -> Vec<RawTask> {
    tasks
        .into_iter()
        .map(|mut task| {
            task.assignees
                .retain(|a| !config.excluded_user_ids.contains(&a.id));
            task
        })
        .filter(|task| {
            task.has_tag(&config.team_tag)
                || task
                    .assignees
                    .iter()
                    .any(|a| config.team_member_ids.contains(&a.id))
        })
        .collect()
}
