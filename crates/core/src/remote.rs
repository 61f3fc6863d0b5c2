//! Thin request/response mapping to the remote todo service.

use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::filter::ListQuery;
use crate::model::{Task, TaskDraft};

static USER_AGENT: &str = concat!("tdo/", env!("CARGO_PKG_VERSION"));

/// Async client for the todo service endpoints.
///
/// Each method maps 1:1 to a resource action; errors are translated into
/// the engine taxonomy so the orchestrator can branch on kind.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: Client,
    base_url: String,
}

impl RemoteClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url().as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the task list for the given query parameters.
    pub async fn list(&self, query: &ListQuery) -> Result<Vec<Task>> {
        let url = format!("{}/todos", self.base_url);
        debug!(%url, "GET todos");
        let response = self.http.get(&url).query(&query.params()).send().await?;
        let response = ok_or_remote(response, None).await?;
        Ok(response.json().await?)
    }

    pub async fn get(&self, id: &str) -> Result<Task> {
        let url = self.todo_url(id);
        debug!(%url, "GET todo");
        let response = self.http.get(&url).send().await?;
        let response = ok_or_remote(response, Some(id)).await?;
        Ok(response.json().await?)
    }

    /// Create a task. An empty title never reaches the network.
    pub async fn create(&self, draft: &TaskDraft) -> Result<Task> {
        draft.validate()?;
        let url = format!("{}/todo", self.base_url);
        debug!(%url, "POST todo");
        let response = self.http.post(&url).json(draft).send().await?;
        let response = ok_or_remote(response, None).await?;
        Ok(response.json().await?)
    }

    /// Replace a task wholesale. The contract is full-object replacement,
    /// not a partial patch; callers read the current task first and send
    /// every field back.
    pub async fn replace(&self, task: &Task) -> Result<()> {
        let url = self.todo_url(&task.id);
        debug!(%url, "PUT todo");
        let response = self.http.put(&url).json(task).send().await?;
        ok_or_remote(response, Some(&task.id)).await?;
        Ok(())
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        let url = self.todo_url(id);
        debug!(%url, "DELETE todo");
        let response = self.http.delete(&url).send().await?;
        ok_or_remote(response, Some(id)).await?;
        Ok(())
    }

    fn todo_url(&self, id: &str) -> String {
        format!("{}/todo/{}", self.base_url, id)
    }
}

async fn ok_or_remote(response: Response, id: Option<&str>) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return Err(Error::NotFound { id: id.to_string() });
        }
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Remote { status, body })
}
