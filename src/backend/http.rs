use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::Backend;
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::model::{
    Category, CreateCategory, CreateTask, MoveTaskPayload, Task, TaskId, UpdateCategory,
    UpdateTask, WeekPlan,
};

/// Planner API client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|token| !token.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "backend request");
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = ensure_success(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<()> {
        ensure_success(builder.send().await?).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    let message = if message.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        message
    };
    Err(Error::Backend {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl Backend for HttpBackend {
    async fn week_plan(&self, week_id: &str) -> Result<WeekPlan> {
        self.fetch(self.request(Method::GET, &format!("/weeks/{week_id}")))
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    Error::WeekNotFound(week_id.to_string())
                } else {
                    err
                }
            })
    }

    async fn week_tasks(&self, week_id: &str) -> Result<Vec<Task>> {
        self.fetch(self.request(Method::GET, &format!("/tasks/{week_id}")))
            .await
    }

    async fn archived_tasks(&self) -> Result<Vec<Task>> {
        self.fetch(self.request(Method::GET, "/tasks/archived")).await
    }

    async fn create_task(&self, week_id: &str, input: &CreateTask) -> Result<Task> {
        let builder = self
            .request(Method::POST, "/tasks")
            .query(&[("weekId", week_id)])
            .json(input);
        self.fetch(builder).await
    }

    async fn update_task(&self, task_id: &TaskId, changes: &UpdateTask) -> Result<Task> {
        let builder = self
            .request(Method::PATCH, &format!("/tasks/{task_id}"))
            .json(changes);
        self.fetch(builder).await
    }

    async fn move_task(&self, task_id: &TaskId, payload: &MoveTaskPayload) -> Result<Task> {
        let builder = self
            .request(Method::PATCH, &format!("/tasks/{task_id}/move"))
            .json(payload);
        self.fetch(builder).await
    }

    async fn delete_task(&self, task_id: &TaskId) -> Result<()> {
        self.execute(self.request(Method::DELETE, &format!("/tasks/{task_id}")))
            .await
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        self.fetch(self.request(Method::GET, "/categories")).await
    }

    async fn create_category(&self, input: &CreateCategory) -> Result<Category> {
        self.fetch(self.request(Method::POST, "/categories").json(input))
            .await
    }

    async fn update_category(
        &self,
        category_id: &str,
        changes: &UpdateCategory,
    ) -> Result<Category> {
        let builder = self
            .request(Method::PATCH, &format!("/categories/{category_id}"))
            .json(changes);
        self.fetch(builder).await
    }

    async fn delete_category(&self, category_id: &str) -> Result<()> {
        self.execute(self.request(Method::DELETE, &format!("/categories/{category_id}")))
            .await
    }
}
