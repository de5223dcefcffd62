use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::app::{RelayError, Result};
use crate::config::AlistConfig;
use crate::domain::{TaskHandle, TaskStatus};
use crate::downloader::DownloadBackend;

static TASK_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^download (.+) to \((.*)\)$").expect("task name pattern is valid")
});

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: String,
}

#[derive(Debug, Deserialize)]
struct AddTaskData {
    #[serde(default)]
    tasks: Vec<AlistTask>,
}

#[derive(Debug, Deserialize)]
struct AlistTask {
    id: String,
    name: String,
    #[serde(default)]
    state: i64,
    #[serde(default)]
    progress: f64,
    #[serde(default)]
    error: String,
}

impl From<AlistTask> for TaskHandle {
    fn from(task: AlistTask) -> Self {
        TaskHandle {
            url: task_url(&task.name).to_string(),
            status: TaskStatus::from_code(task.state),
            backend_id: task.id,
            progress: task.progress,
            error: (!task.error.is_empty()).then_some(task.error),
        }
    }
}

/// Alist names offline tasks `download <url> to (<path>)`.
fn task_url(name: &str) -> &str {
    TASK_NAME
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(name)
}

/// Alist HTTP API client.
pub struct AlistClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    tool: String,
    delete_policy: String,
    token: RwLock<Option<String>>,
}

impl AlistClient {
    pub fn new(client: Client, config: &AlistConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            tool: config.tool.clone(),
            delete_policy: config.delete_policy.clone(),
            token: RwLock::new(None),
        }
    }

    async fn login(&self) -> Result<String> {
        let envelope: Envelope<LoginData> = self
            .client
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&json!({
                "username": self.username,
                "password": self.password,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match (envelope.code, envelope.data) {
            (200, Some(data)) => {
                info!(user = %self.username, "Logged in to Alist");
                Ok(data.token)
            }
            (code, _) => Err(RelayError::Dispatch(format!(
                "Alist login failed ({}): {}",
                code, envelope.message
            ))),
        }
    }

    async fn token(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }

        let mut slot = self.token.write().await;
        // Another caller may have logged in while we waited
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }
        let token = self.login().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    /// Authenticated API call; an expired session is renewed once.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        let mut relogged = false;

        loop {
            let token = self.token().await?;
            let mut request = self
                .client
                .request(method.clone(), &url)
                .header(AUTHORIZATION, token);
            if let Some(body) = body {
                request = request.json(body);
            }

            let envelope: Envelope<T> = request
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            match envelope.code {
                200 => return Ok(envelope.data),
                401 if !relogged => {
                    debug!(path, "Alist session expired, logging in again");
                    *self.token.write().await = None;
                    relogged = true;
                }
                code => {
                    return Err(RelayError::Dispatch(format!(
                        "Alist {} failed ({}): {}",
                        path, code, envelope.message
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl DownloadBackend for AlistClient {
    async fn authenticate(&self) -> Result<()> {
        self.token().await.map(|_| ())
    }

    async fn add_offline_download(&self, path: &str, urls: &[String]) -> Result<Vec<TaskHandle>> {
        let body = json!({
            "path": path,
            "urls": urls,
            "tool": self.tool,
            "delete_policy": self.delete_policy,
        });

        let data: AddTaskData = self
            .call(Method::POST, "/api/fs/add_offline_download", Some(&body))
            .await?
            .ok_or_else(|| {
                RelayError::Dispatch(format!("Alist returned no tasks for {}", path))
            })?;

        Ok(data.tasks.into_iter().map(TaskHandle::from).collect())
    }

    async fn task_list(&self) -> Result<Vec<TaskHandle>> {
        let mut tasks = Vec::new();
        for path in [
            "/api/admin/task/offline_download/undone",
            "/api/admin/task/offline_download/done",
        ] {
            let page: Vec<AlistTask> = self
                .call(Method::GET, path, None)
                .await?
                .unwrap_or_default();
            tasks.extend(page.into_iter().map(TaskHandle::from));
        }
        Ok(tasks)
    }
}
