use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::clickup::types::{Comment, CommentsResponse, ListInfo, TasksPage, TimeInStatus};
use crate::error::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.clickup.com/api/v2";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Thin typed client for the ClickUp v2 API.
///
/// Auth is a static token sent in the `Authorization` header. Every request
/// carries an explicit timeout; a timed-out call surfaces as `Error::Api`
/// and is treated by callers like any other failed call.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl Client {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    /// Override the API origin (test servers, proxies).
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(Error::Config("ClickUp API token is empty".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .header("Authorization", &self.token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(Error::Api(format!("{status} for {path}: {snippet}")));
        }

        Ok(response.json::<T>().await?)
    }

    /// Fetch one page of a list's tasks, including closed tasks and
    /// subtasks, optionally bounded by a creation-date lower bound
    /// (epoch milliseconds).
    pub async fn list_tasks_page(
        &self,
        list_id: &str,
        page: u32,
        created_after_ms: Option<i64>,
    ) -> Result<TasksPage> {
        let mut query = vec![
            ("page", page.to_string()),
            ("include_closed", "true".to_string()),
            ("subtasks", "true".to_string()),
        ];
        if let Some(ms) = created_after_ms {
            query.push(("date_created_gt", ms.to_string()));
        }
        self.get_json(&format!("/list/{list_id}/task"), &query).await
    }

    /// Fetch the precomputed per-status elapsed times for a task.
    pub async fn time_in_status(&self, task_id: &str) -> Result<TimeInStatus> {
        self.get_json(&format!("/task/{task_id}/time_in_status"), &[])
            .await
    }

    /// Fetch a task's comments.
    pub async fn task_comments(&self, task_id: &str) -> Result<Vec<Comment>> {
        let response: CommentsResponse =
            self.get_json(&format!("/task/{task_id}/comment"), &[]).await?;
        Ok(response.comments)
    }

    /// Fetch list metadata, including its configured statuses.
    pub async fn list_info(&self, list_id: &str) -> Result<ListInfo> {
        self.get_json(&format!("/list/{list_id}"), &[]).await
    }
}
