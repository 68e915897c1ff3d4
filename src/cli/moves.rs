//! Move, archive and unarchive commands.

use serde::Serialize;

use super::{parse_day, settle, CommandContext};
use crate::board::Board;
use crate::error::{Error, Result};
use crate::model::{Task, TaskId};
use crate::output::{emit_success, task_line, HumanOutput};
use crate::reorder::{MoveKind, MoveRequest};

pub struct MoveOptions {
    pub task: String,
    pub week: String,
    pub day: u8,
    pub target: Option<String>,
    /// Require the task to be archived.
    pub unarchive: bool,
}

pub struct ArchiveOptions {
    pub task: String,
    pub week: String,
    pub reason: Option<String>,
}

#[derive(Serialize)]
struct MoveReport {
    task_id: TaskId,
    /// `None` when the request changed nothing.
    kind: Option<MoveKind>,
    task: Option<Task>,
}

pub async fn run_move(ctx: &CommandContext, options: MoveOptions) -> Result<()> {
    let day = parse_day(options.day)?;
    let board = ctx.open_board(&options.week).await?;
    let task_id = TaskId::new(options.task);
    let task = board
        .task(&task_id)
        .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
    if options.unarchive && !task.archived {
        return Err(Error::InvalidArgument(format!(
            "task {task_id} is not archived; use `weekboard move`"
        )));
    }

    let mut request = MoveRequest::to_day(task_id.clone(), day);
    if let Some(target) = options.target {
        request = request.with_target(target);
    }
    let kind = board.move_task(&request);
    let command = if options.unarchive { "unarchive" } else { "move" };
    finish(ctx, &board, command, task_id, kind).await
}

pub async fn run_archive(ctx: &CommandContext, options: ArchiveOptions) -> Result<()> {
    let board = ctx.open_board(&options.week).await?;
    let task_id = TaskId::new(options.task);
    let task = board
        .task(&task_id)
        .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
    if task.archived {
        return Err(Error::InvalidArgument(format!(
            "task {task_id} is already archived"
        )));
    }

    let kind = board.archive_task(&task_id, options.reason);
    finish(ctx, &board, "archive", task_id, kind).await
}

async fn finish(
    ctx: &CommandContext,
    board: &Board,
    command: &str,
    task_id: TaskId,
    kind: Option<MoveKind>,
) -> Result<()> {
    settle(board).await?;
    let task = board.task(&task_id);

    let mut human = match kind {
        Some(kind) => {
            let mut human = HumanOutput::new(format!("{command}: {task_id}"));
            human.push_summary("kind", kind.to_string());
            human
        }
        None => {
            let mut human = HumanOutput::new(format!("{command}: {task_id} unchanged"));
            human.push_warning("the drop would not change the order");
            human
        }
    };
    if let Some(task) = &task {
        human.push_detail(task_line(task));
    }

    let report = MoveReport {
        task_id,
        kind,
        task,
    };
    emit_success(ctx.output, command, &report, Some(&human))
}
