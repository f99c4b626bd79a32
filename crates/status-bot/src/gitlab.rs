//! GitLab REST API client implementing [`GitLabApi`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

use crate::api::{ClosesIssuesCursor, GitLabApi};
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{AccessLevel, ClosedByReference, EditableIssue, IssueRef, Member};

/// GitLab API client authenticated with a private token.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    client: reqwest::Client,
    api_url: String,
    page_size: u32,
}

impl GitLabClient {
    /// Create a new GitLab client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the
    /// HTTP client cannot be created.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("ws-status-bot/1.0"));
        if let Some(token) = &config.api_token {
            let mut value =
                HeaderValue::from_str(token).context("GITLAB_API_TOKEN is not a valid header")?;
            value.set_sensitive(true);
            headers.insert("PRIVATE-TOKEN", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url: format!("{}/api/v4", config.gitlab_url),
            page_size: config.page_size,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.api_url);
        debug!(%url, "GitLab GET");
        let response = check_status(self.client.get(&url).send().await?, path).await?;
        decode(response).await
    }
}

async fn check_status(response: Response, what: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(what.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

#[async_trait]
impl GitLabApi for GitLabClient {
    async fn member_access_level(
        &self,
        project_id: u64,
        user_id: u64,
    ) -> Result<AccessLevel, ApiError> {
        let member: Member = self
            .get_json(&format!("/projects/{project_id}/members/{user_id}"))
            .await?;
        Ok(member.access_level)
    }

    async fn issue(&self, project_id: u64, iid: u64) -> Result<EditableIssue, ApiError> {
        self.get_json(&format!("/projects/{project_id}/issues/{iid}"))
            .await
    }

    async fn closed_by(
        &self,
        project_id: u64,
        iid: u64,
    ) -> Result<Vec<ClosedByReference>, ApiError> {
        self.get_json(&format!("/projects/{project_id}/issues/{iid}/closed_by"))
            .await
    }

    async fn save_issue(&self, issue: &EditableIssue) -> Result<(), ApiError> {
        let path = format!("/projects/{}/issues/{}", issue.project_id, issue.iid);
        let url = format!("{}{path}", self.api_url);
        debug!(%url, labels = ?issue.labels, "GitLab PUT");

        let response = self
            .client
            .put(&url)
            .json(&json!({ "labels": issue.labels.join(",") }))
            .send()
            .await?;
        check_status(response, &path).await?;
        Ok(())
    }

    async fn closes_issues(
        &self,
        project_id: u64,
        mr_iid: u64,
    ) -> Result<Box<dyn ClosesIssuesCursor>, ApiError> {
        let mut cursor = PagedClosesIssues {
            client: self.clone(),
            path: format!("/projects/{project_id}/merge_requests/{mr_iid}/closes_issues"),
            total: None,
            buffer: VecDeque::new(),
            next_page: Some(1),
        };
        cursor.fetch_next_page().await?;
        Ok(Box::new(cursor))
    }
}

/// Closes-list cursor that follows GitLab's offset pagination headers.
struct PagedClosesIssues {
    client: GitLabClient,
    path: String,
    total: Option<u64>,
    buffer: VecDeque<IssueRef>,
    next_page: Option<u64>,
}

impl PagedClosesIssues {
    async fn fetch_next_page(&mut self) -> Result<(), ApiError> {
        let Some(page) = self.next_page.take() else {
            return Ok(());
        };
        let url = format!(
            "{}{}?per_page={}&page={page}",
            self.client.api_url, self.path, self.client.page_size
        );
        debug!(%url, "GitLab GET closes_issues page");

        let response = self.client.client.get(&url).send().await?;
        let response = check_status(response, &self.path).await?;

        // X-Total is omitted by GitLab for very large collections
        if let Some(total) = header_u64(response.headers(), "x-total") {
            self.total.get_or_insert(total);
        }
        self.next_page = header_u64(response.headers(), "x-next-page");

        let issues: Vec<IssueRef> = decode(response).await?;
        self.buffer.extend(issues);
        Ok(())
    }
}

#[async_trait]
impl ClosesIssuesCursor for PagedClosesIssues {
    fn total(&self) -> Option<u64> {
        self.total
    }

    async fn next(&mut self) -> Result<Option<IssueRef>, ApiError> {
        loop {
            if let Some(issue) = self.buffer.pop_front() {
                return Ok(Some(issue));
            }
            if self.next_page.is_none() {
                return Ok(None);
            }
            self.fetch_next_page().await?;
        }
    }
}
