use serde::Deserialize;

/// One page of tasks from `GET /list/{list_id}/task`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TasksPage {
    #[serde(default)]
    pub tasks: Vec<RawTask>,
    #[serde(default)]
    pub last_page: Option<bool>,
}

/// A task as returned by the ClickUp API. Fetched fresh on every sync and
/// never persisted verbatim. ClickUp serializes epoch-millisecond timestamps
/// as strings; use [`RawTask::created_ms`] / [`RawTask::closed_ms`].
///
/// Missing fields deserialize to their empty defaults rather than failing
/// the whole page.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTask {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: TaskStatusRef,
    #[serde(default)]
    pub assignees: Vec<Assignee>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub date_closed: Option<String>,
    #[serde(default)]
    pub time_estimate: Option<i64>,
    #[serde(default)]
    pub time_spent: Option<i64>,
}

impl RawTask {
    pub fn created_ms(&self) -> Option<i64> {
        parse_ms(self.date_created.as_deref())
    }

    pub fn closed_ms(&self) -> Option<i64> {
        parse_ms(self.date_closed.as_deref())
    }

    /// Case-insensitive tag membership check.
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags
            .iter()
            .any(|t| t.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskStatusRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Assignee {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub name: String,
}

/// Response of `GET /task/{task_id}/time_in_status`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeInStatus {
    #[serde(default)]
    pub current_status: Option<StatusTime>,
    #[serde(default)]
    pub status_history: Vec<StatusTime>,
}

impl TimeInStatus {
    /// All entries, history plus the current status if present.
    pub fn entries(&self) -> impl Iterator<Item = &StatusTime> {
        self.status_history.iter().chain(self.current_status.iter())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusTime {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub total_time: TotalTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TotalTime {
    #[serde(default)]
    pub by_minute: i64,
    #[serde(default)]
    pub since: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentsResponse {
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub comment_text: String,
    #[serde(default)]
    pub user: Option<Assignee>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Response of `GET /list/{list_id}` — only the fields the pipeline reads.
#[derive(Debug, Clone, Deserialize)]
pub struct ListInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub statuses: Vec<ListStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "type")]
    pub status_type: String,
}

/// Parse a ClickUp epoch-milliseconds string.
pub fn parse_ms(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ms() {
        assert_eq!(parse_ms(Some("1690000000000")), Some(1690000000000));
        assert_eq!(parse_ms(Some(" 42 ")), Some(42));
        assert_eq!(parse_ms(Some("not-a-number")), None);
        assert_eq!(parse_ms(None), None);
    }

    #[test]
    fn test_task_page_deserializes_clickup_payload() {
        let json = r##"{
            "tasks": [{
                "id": "86c0001",
                "name": "VSL cliente X",
                "status": {"id": "st1", "status": "VIDEO: EDITANDO", "color": "#f00", "type": "custom"},
                "assignees": [{"id": 42, "username": "ana", "email": "ana@example.com", "color": "#0f0"}],
                "tags": [{"name": "vsl", "tag_fg": "#fff"}],
                "date_created": "1722470400000",
                "date_closed": null,
                "time_estimate": 3600000,
                "time_spent": 1800000
            }],
            "last_page": false
        }"##;
        let page: TasksPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.tasks.len(), 1);
        assert_eq!(page.last_page, Some(false));

        let task = &page.tasks[0];
        assert_eq!(task.id, "86c0001");
        assert_eq!(task.status.status, "VIDEO: EDITANDO");
        assert_eq!(task.assignees[0].id, 42);
        assert_eq!(task.created_ms(), Some(1722470400000));
        assert_eq!(task.closed_ms(), None);
        assert!(task.has_tag("VSL"));
        assert!(!task.has_tag("ads"));
    }

    #[test]
    fn test_task_with_missing_fields_gets_defaults() {
        let json = r#"{"tasks": [{"id": "86c0002"}]}"#;
        let page: TasksPage = serde_json::from_str(json).unwrap();
        let task = &page.tasks[0];
        assert_eq!(task.name, "");
        assert_eq!(task.status.status, "");
        assert!(task.assignees.is_empty());
        assert!(task.tags.is_empty());
        assert_eq!(task.created_ms(), None);
        assert_eq!(task.time_spent, None);
    }

    #[test]
    fn test_time_in_status_entries_include_current() {
        let json = r#"{
            "current_status": {"status": "VIDEO: REVISÃO", "total_time": {"by_minute": 10, "since": "1722470400000"}},
            "status_history": [
                {"status": "VIDEO: EDITANDO", "total_time": {"by_minute": 30}},
                {"status": "ABERTO", "total_time": {"by_minute": 5}}
            ]
        }"#;
        let tis: TimeInStatus = serde_json::from_str(json).unwrap();
        let statuses: Vec<&str> = tis.entries().map(|e| e.status.as_str()).collect();
        assert_eq!(statuses, vec!["VIDEO: EDITANDO", "ABERTO", "VIDEO: REVISÃO"]);
    }

    #[test]
    fn test_comments_response() {
        let json = r#"{"comments": [
            {"id": "9001", "comment_text": "corrigir legenda aos 0:42", "user": {"id": 7, "username": "captain"}, "date": "1722470400000"},
            {"id": "9002"}
        ]}"#;
        let resp: CommentsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.comments.len(), 2);
        assert_eq!(resp.comments[0].comment_text, "corrigir legenda aos 0:42");
        assert_eq!(resp.comments[1].comment_text, "");
    }
}
