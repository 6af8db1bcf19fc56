use clap::{Parser, Subcommand};

use editordw::{
    config, Database, EditorDW, Period, PeriodType, SyncConfig, SyncOptions, SyncStatus,
};

#[derive(Parser)]
#[command(name = "editordw", about = "ClickUp video-team data warehouse CLI")]
struct Cli {
    /// Database path (default: ~/.editordw/editordw.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// ClickUp personal API token
    #[arg(long, env = "CLICKUP_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// List ids to sync, comma/whitespace/newline separated
    #[arg(long, env = "CLICKUP_LIST_IDS")]
    lists: Option<String>,

    /// Assignee ids stripped from every task (bot/test accounts)
    #[arg(long, env = "CLICKUP_EXCLUDED_USER_IDS")]
    excluded_users: Option<String>,

    /// Editor ids that count as team members
    #[arg(long, env = "CLICKUP_TEAM_MEMBER_IDS")]
    team_members: Option<String>,

    /// Team tag that retains a task regardless of assignees
    #[arg(long, env = "CLICKUP_TEAM_TAG", default_value = "audiovisual")]
    team_tag: String,

    /// Page ceiling per list
    #[arg(long, env = "EDITORDW_MAX_PAGES", default_value_t = 20)]
    max_pages: u32,

    #[command(subcommand)]
    command: Commands,
}

/// Progress reporter that writes to stderr.
struct StderrProgress;

impl editordw::SyncProgress for StderrProgress {
    fn on_list_start(&self, list_id: &str, index: usize, total: usize) {
        eprintln!("[{}/{}] Fetching list {}...", index + 1, total, list_id);
    }

    fn on_tasks_fetched(&self, count: usize) {
        eprintln!("  Fetched {} tasks after filtering", count);
    }

    fn on_phase_resolved(&self, count: usize) {
        eprintln!("  Resolved phase times for {} tasks", count);
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Pull tasks from ClickUp and recompute all rollups
    Sync {
        /// Number of days to look back
        #[arg(long)]
        days: Option<u32>,
        /// Lower bound on task creation date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Read computed metrics
    Metrics {
        #[command(subcommand)]
        target: MetricsTarget,
    },
    /// Resolve one task's per-phase time (history + remote)
    Phase {
        /// Task id or ClickUp task URL
        #[arg(value_name = "TASK_ID_OR_URL")]
        task: String,
        #[arg(long)]
        json: bool,
    },
    /// Categorize one task's review comments
    Feedback {
        /// Task id or ClickUp task URL
        #[arg(value_name = "TASK_ID_OR_URL")]
        task: String,
        #[arg(long)]
        json: bool,
    },
    /// Manage the editor registry
    Editor {
        #[command(subcommand)]
        action: EditorAction,
    },
    /// Manage persisted configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show warehouse status
    Status,
}

#[derive(Subcommand)]
enum MetricsTarget {
    /// One editor's rollup for a period, or their recent trend
    Editor {
        /// ClickUp user id of the editor
        editor_id: i64,
        /// Period key (e.g. 2025-W32, 2025-08, 2025-Q3); default: current week
        #[arg(long)]
        period: Option<String>,
        /// Show the last N buckets instead of a single period
        #[arg(long)]
        trend: Option<u32>,
        /// Bucket type for --trend: week, month, quarter
        #[arg(long, default_value = "week")]
        bucket: String,
        #[arg(long)]
        json: bool,
    },
    /// All editors compared over one period
    Team {
        /// Period key (e.g. 2025-W32, 2025-08, 2025-Q3); default: current week
        #[arg(long)]
        period: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum EditorAction {
    /// Add or update an editor
    Add {
        /// ClickUp user id
        editor_id: i64,
        /// Display name
        name: String,
        #[arg(long)]
        team: Option<String>,
        #[arg(long, default_value = "editor")]
        role: String,
        /// Admission date (YYYY-MM-DD)
        #[arg(long)]
        admission: Option<String>,
    },
    /// List registered editors
    List {
        #[arg(long)]
        json: bool,
    },
    /// Mark an editor inactive
    Deactivate { editor_id: i64 },
    /// Mark an editor active
    Activate { editor_id: i64 },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

fn build_sync_config(cli: &Cli) -> SyncConfig {
    SyncConfig {
        api_token: cli.token.clone(),
        list_ids: cli
            .lists
            .as_deref()
            .map(config::parse_list_ids)
            .unwrap_or_default(),
        excluded_user_ids: cli
            .excluded_users
            .as_deref()
            .map(config::parse_id_set)
            .unwrap_or_default(),
        team_member_ids: cli
            .team_members
            .as_deref()
            .map(config::parse_id_set)
            .unwrap_or_default(),
        team_tag: cli.team_tag.clone(),
        max_pages_per_list: cli.max_pages,
        ..SyncConfig::default()
    }
}

fn parse_period(arg: Option<&str>) -> anyhow::Result<Period> {
    match arg {
        Some(key) => Ok(Period::parse(key)?),
        None => Ok(Period::from_date(
            PeriodType::Week,
            chrono::Utc::now().date_naive(),
        )),
    }
}

fn print_metric(m: &editordw::EditorPeriodMetric) {
    println!(
        "{} — {} ({} to {})",
        m.editor_name, m.period_key, m.period_start, m.period_end
    );
    println!("  Videos completed:   {}", m.total_videos);
    println!(
        "  With alteration:    {} ({}%)",
        m.videos_with_alteration, m.alteration_rate
    );
    println!("  Editing hours:      {:.2} total, {:.2} avg", m.total_editing_hours, m.avg_editing_hours);
    println!(
        "  Scores:             productivity {:.1}, quality {:.1}",
        m.productivity_score, m.quality_score
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => Database::open_at(path).await?,
        None => Database::open().await?,
    };
    let sync_config = build_sync_config(&cli);
    let dw = EditorDW::new(db, sync_config)?;

    match cli.command {
        Commands::Sync { days, since, json } => {
            let options = SyncOptions {
                since: since
                    .as_deref()
                    .and_then(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()),
                days,
            };
            let report = dw.sync(&options, &StderrProgress).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                match report.status {
                    SyncStatus::NotConfigured => {
                        println!("Sync skipped: source not configured");
                    }
                    _ => println!("Sync {}", report.status.as_str()),
                }
                println!("  Tasks processed: {}", report.tasks_processed);
                println!("  Tasks saved:     {}", report.tasks_saved);
                println!("  Metrics saved:   {}", report.metrics_saved);
                if !report.errors.is_empty() {
                    println!("  Errors ({}):", report.errors.len());
                    for error in &report.errors {
                        println!("    - {error}");
                    }
                }
            }
        }
        Commands::Metrics { target } => match target {
            MetricsTarget::Editor {
                editor_id,
                period,
                trend,
                bucket,
                json,
            } => {
                if let Some(limit) = trend {
                    let period_type = PeriodType::parse(&bucket)?;
                    let rows = dw.metrics_trend(editor_id, period_type, limit).await?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&rows)?);
                    } else if rows.is_empty() {
                        println!("No metrics for editor {editor_id}. Run a sync first.");
                    } else {
                        for m in &rows {
                            print_metric(m);
                        }
                    }
                } else {
                    let period = parse_period(period.as_deref())?;
                    match dw.metrics_for_editor(editor_id, period).await? {
                        Some(m) => {
                            if json {
                                println!("{}", serde_json::to_string_pretty(&m)?);
                            } else {
                                print_metric(&m);
                            }
                        }
                        None => println!(
                            "No metrics for editor {editor_id} in {}. Run a sync first.",
                            period.to_key()
                        ),
                    }
                }
            }
            MetricsTarget::Team { period, json } => {
                let period = parse_period(period.as_deref())?;
                let rows = dw.metrics_for_period(period).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                } else if rows.is_empty() {
                    println!("No metrics for {}. Run a sync first.", period.to_key());
                } else {
                    println!("Editors for {} (best productivity first):", period.to_key());
                    for m in &rows {
                        println!(
                            "  {:<20} videos {:<3} alteration {:>3}%  prod {:>5.1}  quality {:>5.1}",
                            m.editor_name,
                            m.total_videos,
                            m.alteration_rate,
                            m.productivity_score,
                            m.quality_score
                        );
                    }
                }
            }
        },
        Commands::Phase { task, json } => match dw.phase_for_task(&task).await? {
            Some(phase) => {
                if json {
                    println!("{}", serde_json::to_string_pretty(&phase)?);
                } else {
                    let hours = |ms: u64| ms as f64 / 3_600_000.0;
                    println!("Editing:    {:.2}h", hours(phase.editing_ms));
                    println!("Revision:   {:.2}h", hours(phase.revision_ms));
                    println!("Alteration: {:.2}h", hours(phase.alteration_ms));
                    println!("Approval:   {:.2}h", hours(phase.approval_ms));
                    println!("Total:      {:.2}h", hours(phase.total_ms));
                }
            }
            None => println!("No phase data available for this task."),
        },
        Commands::Feedback { task, json } => {
            let counts = dw.feedback_for_task(&task).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&counts)?);
            } else if counts.total == 0 {
                println!("No comments on this task.");
            } else {
                println!("{} comments:", counts.total);
                for cc in &counts.categories {
                    if cc.count > 0 {
                        println!("  {:<10} {:>3} ({:.0}%)", cc.category.as_str(), cc.count, cc.pct);
                    }
                }
            }
        }
        Commands::Editor { action } => match action {
            EditorAction::Add {
                editor_id,
                name,
                team,
                role,
                admission,
            } => {
                dw.editor_add(editor_id, &name, team.as_deref(), &role, admission.as_deref())
                    .await?;
                println!("Saved editor {editor_id} ({name})");
            }
            EditorAction::List { json } => {
                let editors = dw.editor_list().await?;
                if json {
                    #[derive(serde::Serialize)]
                    struct Row<'a> {
                        editor_id: i64,
                        name: &'a str,
                        team_id: Option<&'a str>,
                        role: &'a str,
                        admission_date: Option<&'a str>,
                        is_active: bool,
                    }
                    let rows: Vec<Row> = editors
                        .iter()
                        .map(|e| Row {
                            editor_id: e.editor_id,
                            name: &e.name,
                            team_id: e.team_id.as_deref(),
                            role: &e.role,
                            admission_date: e.admission_date.as_deref(),
                            is_active: e.is_active,
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                } else if editors.is_empty() {
                    println!("No editors registered. Use 'editordw editor add'.");
                } else {
                    for e in &editors {
                        let flag = if e.is_active { "" } else { " (inactive)" };
                        println!("  {:<12} {}{}  [{}]", e.editor_id, e.name, flag, e.role);
                    }
                }
            }
            EditorAction::Deactivate { editor_id } => {
                if dw.editor_set_active(editor_id, false).await? {
                    println!("Editor {editor_id} deactivated");
                } else {
                    println!("Editor {editor_id} not found");
                }
            }
            EditorAction::Activate { editor_id } => {
                if dw.editor_set_active(editor_id, true).await? {
                    println!("Editor {editor_id} activated");
                } else {
                    println!("Editor {editor_id} not found");
                }
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::Get { key } => match dw.config_get(&key).await? {
                Some(value) => println!("{value}"),
                None => println!("(not set)"),
            },
            ConfigAction::Set { key, value } => {
                dw.config_set(&key, &value).await?;
                println!("Set {key}");
            }
            ConfigAction::List => {
                for (key, value) in dw.config_list().await? {
                    println!("{key} = {value}");
                }
            }
        },
        Commands::Status => {
            let (total, completed, editors, last_job) = dw.status_summary().await?;
            println!("Task snapshots: {total} ({completed} completed)");
            println!("Editors:        {editors}");
            match last_job {
                Some(job) => {
                    println!(
                        "Last sync:      {} at {} ({} tasks, {} metrics, {} errors)",
                        job.status, job.started_at, job.tasks_saved, job.metrics_saved, job.error_count
                    );
                }
                None => println!("Last sync:      never"),
            }
        }
    }

    Ok(())
}
