//! Read-only listing commands.

use serde::Serialize;

use super::{parse_day, CommandContext};
use crate::error::Result;
use crate::model::{Category, Task};
use crate::output::{emit_success, task_line, HumanOutput};
use crate::store::CacheKey;

pub struct ListOptions {
    pub week: String,
    pub day: Option<u8>,
}

#[derive(Serialize)]
struct WeekReport {
    week_id: String,
    tasks: Vec<Task>,
}

pub async fn run_list(ctx: &CommandContext, options: ListOptions) -> Result<()> {
    let board = ctx.open_board(&options.week).await?;
    let tasks = match options.day {
        Some(day) => board.day(parse_day(day)?),
        None => board.tasks(),
    };

    let mut human = HumanOutput::new(format!("week {}", options.week));
    human.push_summary("tasks", tasks.len().to_string());
    for task in &tasks {
        human.push_detail(task_line(task));
    }
    if tasks.is_empty() {
        human.push_next_step(format!(
            "weekboard create --week {} --day 1 --title \"...\"",
            options.week
        ));
    }

    let report = WeekReport {
        week_id: options.week,
        tasks,
    };
    emit_success(ctx.output, "tasks", &report, Some(&human))
}

pub async fn run_archived(ctx: &CommandContext) -> Result<()> {
    let sync = ctx.coordinator()?;
    sync.refresh(&CacheKey::Archive).await?;
    let tasks = sync.store().read_tasks(&CacheKey::Archive).unwrap_or_default();

    let mut human = HumanOutput::new("archive");
    human.push_summary("tasks", tasks.len().to_string());
    for task in &tasks {
        let mut line = task_line(task);
        if let Some(reason) = &task.archive_reason {
            line.push_str(&format!(" - {reason}"));
        }
        human.push_detail(line);
    }
    emit_success(ctx.output, "archived", &tasks, Some(&human))
}

pub async fn run_categories(ctx: &CommandContext) -> Result<()> {
    let sync = ctx.coordinator()?;
    sync.refresh(&CacheKey::Categories).await?;
    let categories: Vec<Category> = sync.store().read_categories().unwrap_or_default();

    let mut human = HumanOutput::new("categories");
    for category in &categories {
        let mut line = format!(
            "{}  {}  {}/{} min",
            category.id, category.name, category.actual_time, category.planned_time
        );
        if category.actual_time > category.planned_time && category.planned_time > 0 {
            line.push_str(" (over)");
        }
        human.push_detail(line);
    }
    emit_success(ctx.output, "categories", &categories, Some(&human))
}
