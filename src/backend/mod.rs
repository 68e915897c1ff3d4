//! Backend contract consumed by the board.
//!
//! The planner API is REST-like; [`HttpBackend`] talks to it over HTTP. The
//! sync coordinator only needs failures to be distinguishable from success,
//! so every method returns [`crate::Result`].

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    Category, CreateCategory, CreateTask, MoveTaskPayload, Task, TaskId, UpdateCategory,
    UpdateTask, WeekPlan,
};

mod http;

pub use http::HttpBackend;

#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET /weeks/{weekId}`
    async fn week_plan(&self, week_id: &str) -> Result<WeekPlan>;

    /// `GET /tasks/{weekId}`
    async fn week_tasks(&self, week_id: &str) -> Result<Vec<Task>>;

    /// `GET /tasks/archived`
    async fn archived_tasks(&self) -> Result<Vec<Task>>;

    /// `POST /tasks?weekId=...`
    async fn create_task(&self, week_id: &str, input: &CreateTask) -> Result<Task>;

    /// `PATCH /tasks/{taskId}`
    async fn update_task(&self, task_id: &TaskId, changes: &UpdateTask) -> Result<Task>;

    /// `PATCH /tasks/{taskId}/move`
    async fn move_task(&self, task_id: &TaskId, payload: &MoveTaskPayload) -> Result<Task>;

    /// `DELETE /tasks/{taskId}`
    async fn delete_task(&self, task_id: &TaskId) -> Result<()>;

    /// `GET /categories`
    async fn categories(&self) -> Result<Vec<Category>>;

    /// `POST /categories`
    async fn create_category(&self, input: &CreateCategory) -> Result<Category>;

    /// `PATCH /categories/{id}`
    async fn update_category(&self, category_id: &str, changes: &UpdateCategory)
        -> Result<Category>;

    /// `DELETE /categories/{id}`
    async fn delete_category(&self, category_id: &str) -> Result<()>;
}
