#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use weekboard::backend::Backend;
use weekboard::board::Board;
use weekboard::error::{Error, Result};
use weekboard::model::{
    Category, CreateCategory, CreateTask, Day, MoveTaskPayload, Task, TaskId, UpdateCategory,
    UpdateTask, WeekPlan,
};
use weekboard::store::TaskStore;
use weekboard::sync::SyncCoordinator;

pub const WEEK_ID: &str = "w1";

/// A call the board made against the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Move(TaskId, MoveTaskPayload),
    Create(String, CreateTask),
    Update(TaskId, UpdateTask),
    Delete(TaskId),
}

#[derive(Default)]
struct ServerState {
    tasks: Vec<Task>,
    categories: Vec<Category>,
    calls: Vec<Call>,
    fetches: usize,
    next_id: u64,
    fail_moves: bool,
    fail_creates: bool,
    fail_fetches: bool,
}

/// In-memory planner API. Successful writes change the server state so
/// refetches return what the server believes.
pub struct FakeBackend {
    week: WeekPlan,
    state: Mutex<ServerState>,
}

impl FakeBackend {
    pub fn new(tasks: Vec<Task>, categories: Vec<Category>) -> Arc<Self> {
        Arc::new(Self {
            week: week_plan(),
            state: Mutex::new(ServerState {
                tasks,
                categories,
                ..Default::default()
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().expect("fake backend lock")
    }

    pub fn fail_moves(&self, fail: bool) {
        self.state().fail_moves = fail;
    }

    pub fn fail_creates(&self, fail: bool) {
        self.state().fail_creates = fail;
    }

    /// Make every list fetch (week, archive, categories) fail.
    pub fn fail_fetches(&self, fail: bool) {
        self.state().fail_fetches = fail;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn move_calls(&self) -> Vec<(TaskId, MoveTaskPayload)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Move(id, payload) => Some((id, payload)),
                _ => None,
            })
            .collect()
    }

    /// Number of list fetches served (week, archive, categories).
    pub fn fetches(&self) -> usize {
        self.state().fetches
    }

    pub fn server_task(&self, id: &str) -> Option<Task> {
        self.state()
            .tasks
            .iter()
            .find(|task| task.id.as_str() == id)
            .cloned()
    }
}

fn failure() -> Error {
    Error::Backend {
        status: 500,
        message: "scripted failure".to_string(),
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn week_plan(&self, week_id: &str) -> Result<WeekPlan> {
        if week_id == self.week.id {
            Ok(self.week.clone())
        } else {
            Err(Error::WeekNotFound(week_id.to_string()))
        }
    }

    async fn week_tasks(&self, _week_id: &str) -> Result<Vec<Task>> {
        let mut state = self.state();
        if state.fail_fetches {
            return Err(failure());
        }
        state.fetches += 1;
        Ok(state.tasks.iter().filter(|t| !t.archived).cloned().collect())
    }

    async fn archived_tasks(&self) -> Result<Vec<Task>> {
        let mut state = self.state();
        if state.fail_fetches {
            return Err(failure());
        }
        state.fetches += 1;
        Ok(state.tasks.iter().filter(|t| t.archived).cloned().collect())
    }

    async fn create_task(&self, week_id: &str, input: &CreateTask) -> Result<Task> {
        let mut state = self.state();
        state
            .calls
            .push(Call::Create(week_id.to_string(), input.clone()));
        if state.fail_creates {
            return Err(failure());
        }
        state.next_id += 1;
        let id = TaskId::new(format!("srv-{}", state.next_id));
        let task = input.to_task(id, Utc::now());
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, task_id: &TaskId, changes: &UpdateTask) -> Result<Task> {
        let mut state = self.state();
        state
            .calls
            .push(Call::Update(task_id.clone(), changes.clone()));
        let task = state
            .tasks
            .iter_mut()
            .find(|task| task.id == *task_id)
            .ok_or_else(|| Error::Backend {
                status: 404,
                message: "Task not found".to_string(),
            })?;
        changes.apply_to(task);
        Ok(task.clone())
    }

    async fn move_task(&self, task_id: &TaskId, payload: &MoveTaskPayload) -> Result<Task> {
        let mut state = self.state();
        state
            .calls
            .push(Call::Move(task_id.clone(), payload.clone()));
        if state.fail_moves {
            return Err(failure());
        }
        let task = state
            .tasks
            .iter_mut()
            .find(|task| task.id == *task_id)
            .ok_or_else(|| Error::Backend {
                status: 404,
                message: "Task not found".to_string(),
            })?;
        if payload.is_archive == Some(true) {
            task.archived = true;
            task.archive_reason = payload.archive_reason.clone();
        } else {
            task.archived = false;
            task.archive_reason = None;
        }
        if let Some(day) = payload.day {
            task.day = day;
        }
        if let Some(date) = payload.date {
            task.date = date;
        }
        if let Some(position) = payload.position {
            task.position = position;
        }
        Ok(task.clone())
    }

    async fn delete_task(&self, task_id: &TaskId) -> Result<()> {
        let mut state = self.state();
        state.calls.push(Call::Delete(task_id.clone()));
        state.tasks.retain(|task| task.id != *task_id);
        Ok(())
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let mut state = self.state();
        if state.fail_fetches {
            return Err(failure());
        }
        state.fetches += 1;
        Ok(state.categories.clone())
    }

    async fn create_category(&self, input: &CreateCategory) -> Result<Category> {
        let mut state = self.state();
        let category = Category {
            id: format!("cat-{}", state.categories.len() + 1),
            user_id: "u1".to_string(),
            name: input.name.clone(),
            planned_time: input.planned_time,
            actual_time: 0,
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        category_id: &str,
        changes: &UpdateCategory,
    ) -> Result<Category> {
        let mut state = self.state();
        let category = state
            .categories
            .iter_mut()
            .find(|category| category.id == category_id)
            .ok_or_else(|| Error::Backend {
                status: 404,
                message: "Category not found".to_string(),
            })?;
        if let Some(name) = &changes.name {
            category.name = name.clone();
        }
        if let Some(planned) = changes.planned_time {
            category.planned_time = planned;
        }
        Ok(category.clone())
    }

    async fn delete_category(&self, category_id: &str) -> Result<()> {
        self.state()
            .categories
            .retain(|category| category.id != category_id);
        Ok(())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn week_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0)
        .single()
        .expect("week start")
}

pub fn week_plan() -> WeekPlan {
    WeekPlan {
        id: WEEK_ID.to_string(),
        start_date: week_start(),
        end_date: week_start() + chrono::Duration::days(6),
        month_id: None,
    }
}

pub fn day(value: u8) -> Day {
    Day::new(value).expect("valid day")
}

pub fn task(id: &str, on: u8, position: i64) -> Task {
    let on = day(on);
    let mut task = CreateTask::new(id, on, week_plan().date_for(on))
        .to_task(TaskId::from(id), week_start());
    task.position = position;
    task
}

pub fn tracked_task(id: &str, on: u8, position: i64, category: &str, minutes: u32) -> Task {
    let mut task = task(id, on, position);
    task.category_id = Some(category.to_string());
    task.duration = Some(minutes);
    task
}

pub fn archived_task(id: &str, position: i64) -> Task {
    let mut task = task(id, 1, position);
    task.archived = true;
    task
}

pub fn category(id: &str, planned: i64, actual: i64) -> Category {
    Category {
        id: id.to_string(),
        user_id: "u1".to_string(),
        name: id.to_uppercase(),
        planned_time: planned,
        actual_time: actual,
    }
}

pub fn ids(tasks: &[Task]) -> Vec<String> {
    tasks.iter().map(|task| task.id.to_string()).collect()
}

pub async fn open_board(backend: Arc<FakeBackend>, debounce: Duration) -> Board {
    let sync = SyncCoordinator::new(backend, TaskStore::new(), debounce).expect("coordinator");
    Board::open(sync, WEEK_ID).await.expect("open board")
}
