//! Create, update and delete commands.

use serde::Serialize;

use super::{parse_day, settle, CommandContext};
use crate::error::{Error, Result};
use crate::model::{CreateTask, Priority, Task, TaskId, TaskStatus, UpdateTask};
use crate::output::{emit_success, task_line, HumanOutput};

pub struct CreateOptions {
    pub week: String,
    pub day: u8,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub duration: Option<u32>,
    pub category: Option<String>,
}

pub struct UpdateOptions {
    pub task: String,
    pub week: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub duration: Option<u32>,
    pub category: Option<String>,
}

pub struct DeleteOptions {
    pub task: String,
    pub week: String,
}

#[derive(Serialize)]
struct TaskReport {
    task: Task,
}

#[derive(Serialize)]
struct DeleteReport {
    task_id: TaskId,
    deleted: bool,
}

pub async fn run_create(ctx: &CommandContext, options: CreateOptions) -> Result<()> {
    let title = options.title.trim().to_string();
    if title.is_empty() {
        return Err(Error::InvalidArgument("title cannot be empty".to_string()));
    }
    let day = parse_day(options.day)?;
    let board = ctx.open_board(&options.week).await?;

    let mut input = CreateTask::new(title, day, board.week().date_for(day));
    input.description = options.description;
    input.duration = options.duration;
    input.category_id = options.category;
    if let Some(priority) = options.priority.as_deref() {
        input.priority = priority.parse::<Priority>()?;
    }

    let temp_id = board.create_task(input);
    let position = board.task(&temp_id).map(|task| task.position);
    settle(&board).await?;

    // The temporary id has been swapped for the server id at the same slot.
    let task = board
        .task(&temp_id)
        .or_else(|| {
            board
                .day(day)
                .into_iter()
                .find(|task| Some(task.position) == position)
        })
        .ok_or_else(|| Error::TaskNotFound(temp_id.to_string()))?;

    let mut human = HumanOutput::new(format!("created: {}", task.id));
    human.push_detail(task_line(&task));
    emit_success(ctx.output, "create", &TaskReport { task }, Some(&human))
}

pub async fn run_update(ctx: &CommandContext, options: UpdateOptions) -> Result<()> {
    let changes = UpdateTask {
        title: options.title,
        description: options.description,
        priority: options
            .priority
            .as_deref()
            .map(str::parse::<Priority>)
            .transpose()?,
        duration: options.duration,
        status: options
            .status
            .as_deref()
            .map(str::parse::<TaskStatus>)
            .transpose()?,
        category_id: options.category,
    };
    if changes.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to update: pass at least one field".to_string(),
        ));
    }

    let board = ctx.open_board(&options.week).await?;
    let task_id = TaskId::new(options.task);
    if !board.update_task(&task_id, changes) {
        return Err(Error::TaskNotFound(task_id.to_string()));
    }
    settle(&board).await?;

    let task = board
        .task(&task_id)
        .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
    let mut human = HumanOutput::new(format!("updated: {task_id}"));
    human.push_detail(task_line(&task));
    emit_success(ctx.output, "update", &TaskReport { task }, Some(&human))
}

pub async fn run_delete(ctx: &CommandContext, options: DeleteOptions) -> Result<()> {
    let board = ctx.open_board(&options.week).await?;
    let task_id = TaskId::new(options.task);
    if !board.delete_task(&task_id) {
        return Err(Error::TaskNotFound(task_id.to_string()));
    }
    settle(&board).await?;

    let human = HumanOutput::new(format!("deleted: {task_id}"));
    let report = DeleteReport {
        task_id,
        deleted: true,
    };
    emit_success(ctx.output, "delete", &report, Some(&human))
}
