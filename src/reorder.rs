//! Reorder engine for the week board.
//!
//! A drop is first resolved into a [`MoveOp`] by [`classify`], which detects
//! every no-op (self drops, stale ids, drops that change nothing). The op is
//! then applied to the week and archive snapshots by [`apply`]. Both steps
//! are pure and never fail: a request that cannot be honoured yields `None`.
//!
//! # Relative placement
//!
//! When a task is dropped onto another task, the side of the anchor it lands
//! on is decided by their positions *before* the move. If the dragged task's
//! position is greater than the anchor's, it goes before the anchor.
//! Otherwise it goes after. Cursor geometry plays no part.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::categories::CategoryAdjustment;
use crate::model::{Day, Task, TaskId};
use crate::position::{self, POSITION_STEP};

/// Side of the anchor task a dropped task lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Before,
    After,
}

/// Placement of `moved` relative to `anchor`, from pre-move positions.
pub fn relative_side(moved: &Task, anchor: &Task) -> Side {
    if moved.position > anchor.position {
        Side::Before
    } else {
        Side::After
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Day(Day),
    Archive,
}

/// A drop as reported by the board: which task, where, and next to what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub task_id: TaskId,
    pub destination: Destination,
    pub target_task_id: Option<TaskId>,
}

impl MoveRequest {
    pub fn to_day(task_id: impl Into<TaskId>, day: Day) -> Self {
        Self {
            task_id: task_id.into(),
            destination: Destination::Day(day),
            target_task_id: None,
        }
    }

    pub fn to_archive(task_id: impl Into<TaskId>) -> Self {
        Self {
            task_id: task_id.into(),
            destination: Destination::Archive,
            target_task_id: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<TaskId>) -> Self {
        self.target_task_id = Some(target.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub task_id: TaskId,
    pub side: Side,
}

/// A validated move, carrying exactly what each kind needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOp {
    WithinDay {
        task_id: TaskId,
        day: Day,
        anchor: Anchor,
    },
    CrossDay {
        task_id: TaskId,
        from: Day,
        to: Day,
        anchor: Anchor,
    },
    /// No anchor: append to the end of the destination day.
    ToEmptyDay {
        task_id: TaskId,
        from: Day,
        to: Day,
    },
    Archive {
        task_id: TaskId,
        from: Day,
    },
    Unarchive {
        task_id: TaskId,
        to: Day,
        anchor: Option<Anchor>,
    },
}

impl MoveOp {
    pub fn task_id(&self) -> &TaskId {
        match self {
            MoveOp::WithinDay { task_id, .. }
            | MoveOp::CrossDay { task_id, .. }
            | MoveOp::ToEmptyDay { task_id, .. }
            | MoveOp::Archive { task_id, .. }
            | MoveOp::Unarchive { task_id, .. } => task_id,
        }
    }

    pub fn kind(&self) -> MoveKind {
        match self {
            MoveOp::WithinDay { .. } => MoveKind::WithinDay,
            MoveOp::CrossDay { .. } => MoveKind::CrossDay,
            MoveOp::ToEmptyDay { .. } => MoveKind::ToEmptyDay,
            MoveOp::Archive { .. } => MoveKind::Archive,
            MoveOp::Unarchive { .. } => MoveKind::Unarchive,
        }
    }

    pub fn anchor(&self) -> Option<&Anchor> {
        match self {
            MoveOp::WithinDay { anchor, .. } | MoveOp::CrossDay { anchor, .. } => Some(anchor),
            MoveOp::Unarchive { anchor, .. } => anchor.as_ref(),
            MoveOp::ToEmptyDay { .. } | MoveOp::Archive { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    WithinDay,
    CrossDay,
    ToEmptyDay,
    Archive,
    Unarchive,
}

impl MoveKind {
    /// Archive and unarchive touch the archive partition.
    pub fn touches_archive(self) -> bool {
        matches!(self, MoveKind::Archive | MoveKind::Unarchive)
    }
}

impl fmt::Display for MoveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MoveKind::WithinDay => "within_day",
            MoveKind::CrossDay => "cross_day",
            MoveKind::ToEmptyDay => "to_empty_day",
            MoveKind::Archive => "archive",
            MoveKind::Unarchive => "unarchive",
        };
        f.write_str(label)
    }
}

/// Inputs to placement that do not come from the snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveContext {
    /// Start of the week plan; day changes re-stamp `date` from it.
    pub week_start: Option<DateTime<Utc>>,
    pub step: i64,
}

impl Default for MoveContext {
    fn default() -> Self {
        Self {
            week_start: None,
            step: POSITION_STEP,
        }
    }
}

/// Result of applying a move to the snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub kind: MoveKind,
    /// Full week partition after the move, in display order.
    pub week: Vec<Task>,
    /// Full archive partition, when the move touched it.
    pub archive: Option<Vec<Task>>,
    /// The moved task as it now sits in its new partition.
    pub moved: Task,
    pub adjustments: Vec<CategoryAdjustment>,
}

/// Classify and apply in one step.
pub fn plan(
    request: &MoveRequest,
    week: &[Task],
    archive: &[Task],
    ctx: &MoveContext,
) -> Option<MoveOutcome> {
    let op = classify(request, week, archive)?;
    apply(&op, week, archive, ctx)
}

/// Resolve a drop into a move, or `None` when nothing should happen.
pub fn classify(request: &MoveRequest, week: &[Task], archive: &[Task]) -> Option<MoveOp> {
    if request.target_task_id.as_ref() == Some(&request.task_id) {
        debug!(task = %request.task_id, "drop onto itself ignored");
        return None;
    }

    let in_week = week.iter().find(|task| task.id == request.task_id);
    let in_archive = archive.iter().find(|task| task.id == request.task_id);

    let to = match request.destination {
        Destination::Archive => {
            // The anchor is ignored: archive insertion always appends.
            let Some(task) = in_week else {
                debug!(task = %request.task_id, "archive request for task not on the board");
                return None;
            };
            return Some(MoveOp::Archive {
                task_id: task.id.clone(),
                from: task.day,
            });
        }
        Destination::Day(day) => day,
    };

    let anchor_task = match &request.target_task_id {
        Some(target) => {
            let found = week
                .iter()
                .find(|task| task.id == *target && task.day == to);
            if found.is_none() {
                debug!(task = %request.task_id, anchor = %target, "anchor not in destination day");
                return None;
            }
            found
        }
        None => None,
    };

    if let Some(task) = in_week {
        let anchor = anchor_task.map(|anchor| Anchor {
            task_id: anchor.id.clone(),
            side: relative_side(task, anchor),
        });

        if task.day == to {
            let anchor = anchor?;
            if !reorder_changes_order(week, task, &anchor) {
                return None;
            }
            return Some(MoveOp::WithinDay {
                task_id: task.id.clone(),
                day: to,
                anchor,
            });
        }

        return Some(match anchor {
            Some(anchor) => MoveOp::CrossDay {
                task_id: task.id.clone(),
                from: task.day,
                to,
                anchor,
            },
            None => MoveOp::ToEmptyDay {
                task_id: task.id.clone(),
                from: task.day,
                to,
            },
        });
    }

    if let Some(task) = in_archive {
        return Some(MoveOp::Unarchive {
            task_id: task.id.clone(),
            to,
            anchor: anchor_task.map(|anchor| Anchor {
                task_id: anchor.id.clone(),
                side: relative_side(task, anchor),
            }),
        });
    }

    debug!(task = %request.task_id, "move request for unknown task");
    None
}

/// Apply a classified move to the snapshots.
///
/// Returns `None` only if the snapshots no longer contain the tasks the op
/// names.
pub fn apply(
    op: &MoveOp,
    week: &[Task],
    archive: &[Task],
    ctx: &MoveContext,
) -> Option<MoveOutcome> {
    match op {
        MoveOp::WithinDay {
            task_id,
            day,
            anchor,
        } => {
            let mut tasks = position::day_partition(week, *day);
            let moved = take(&mut tasks, task_id)?;
            insert_relative(&mut tasks, moved, Some(anchor));
            position::renumber_with_step(&mut tasks, ctx.step);
            let moved = find(&tasks, task_id)?;
            Some(MoveOutcome {
                kind: MoveKind::WithinDay,
                week: merge_days(week, vec![(*day, tasks)]),
                archive: None,
                moved,
                adjustments: Vec::new(),
            })
        }
        MoveOp::CrossDay {
            task_id,
            from,
            to,
            anchor,
        } => move_between_days(week, task_id, *from, *to, Some(anchor), ctx, MoveKind::CrossDay),
        MoveOp::ToEmptyDay { task_id, from, to } => {
            move_between_days(week, task_id, *from, *to, None, ctx, MoveKind::ToEmptyDay)
        }
        MoveOp::Archive { task_id, from } => {
            let mut source = position::day_partition(week, *from);
            let mut moved = take(&mut source, task_id)?;
            position::renumber_with_step(&mut source, ctx.step);

            let adjustments = CategoryAdjustment::removed(&moved).into_iter().collect();
            moved.archived = true;

            let mut archived = sorted_archive(archive, task_id);
            archived.push(moved);
            position::renumber_with_step(&mut archived, ctx.step);
            let moved = find(&archived, task_id)?;

            Some(MoveOutcome {
                kind: MoveKind::Archive,
                week: merge_days(week, vec![(*from, source)]),
                archive: Some(archived),
                moved,
                adjustments,
            })
        }
        MoveOp::Unarchive {
            task_id,
            to,
            anchor,
        } => {
            let mut archived = sorted_archive(archive, task_id);
            let mut moved = archive.iter().find(|task| task.id == *task_id)?.clone();
            position::renumber_with_step(&mut archived, ctx.step);

            let adjustments = CategoryAdjustment::added(&moved).into_iter().collect();
            moved.archived = false;
            moved.archive_reason = None;
            moved.day = *to;
            if let Some(start) = ctx.week_start {
                moved.date = start + Duration::days(to.offset());
            }

            let mut target = position::day_partition(week, *to);
            target.retain(|task| task.id != *task_id);
            insert_relative(&mut target, moved, anchor.as_ref());
            position::renumber_with_step(&mut target, ctx.step);
            let moved = find(&target, task_id)?;

            Some(MoveOutcome {
                kind: MoveKind::Unarchive,
                week: merge_days(week, vec![(*to, target)]),
                archive: Some(archived),
                moved,
                adjustments,
            })
        }
    }
}

fn move_between_days(
    week: &[Task],
    task_id: &TaskId,
    from: Day,
    to: Day,
    anchor: Option<&Anchor>,
    ctx: &MoveContext,
    kind: MoveKind,
) -> Option<MoveOutcome> {
    let mut source = position::day_partition(week, from);
    let mut moved = take(&mut source, task_id)?;
    position::renumber_with_step(&mut source, ctx.step);

    moved.date = match ctx.week_start {
        Some(start) => start + Duration::days(to.offset()),
        None => moved.date + Duration::days(to.offset() - from.offset()),
    };
    moved.day = to;

    let mut target = position::day_partition(week, to);
    insert_relative(&mut target, moved, anchor);
    position::renumber_with_step(&mut target, ctx.step);
    let moved = find(&target, task_id)?;

    Some(MoveOutcome {
        kind,
        week: merge_days(week, vec![(from, source), (to, target)]),
        archive: None,
        moved,
        adjustments: Vec::new(),
    })
}

fn take(tasks: &mut Vec<Task>, task_id: &TaskId) -> Option<Task> {
    let index = tasks.iter().position(|task| task.id == *task_id)?;
    Some(tasks.remove(index))
}

fn find(tasks: &[Task], task_id: &TaskId) -> Option<Task> {
    tasks.iter().find(|task| task.id == *task_id).cloned()
}

/// Insert next to the anchor, or append when there is none (or it vanished).
fn insert_relative(tasks: &mut Vec<Task>, task: Task, anchor: Option<&Anchor>) {
    let index = anchor
        .and_then(|anchor| {
            tasks
                .iter()
                .position(|candidate| candidate.id == anchor.task_id)
                .map(|index| match anchor.side {
                    Side::Before => index,
                    Side::After => index + 1,
                })
        })
        .unwrap_or(tasks.len());
    tasks.insert(index, task);
}

fn reorder_changes_order(week: &[Task], task: &Task, anchor: &Anchor) -> bool {
    let current = position::day_partition(week, task.day);
    let mut reordered = current.clone();
    let Some(moved) = take(&mut reordered, &task.id) else {
        return false;
    };
    insert_relative(&mut reordered, moved, Some(anchor));
    current
        .iter()
        .zip(reordered.iter())
        .any(|(left, right)| left.id != right.id)
}

fn sorted_archive(archive: &[Task], excluding: &TaskId) -> Vec<Task> {
    let mut tasks: Vec<Task> = archive
        .iter()
        .filter(|task| task.id != *excluding)
        .cloned()
        .collect();
    position::sort_by_position(&mut tasks);
    tasks
}

/// Replace whole day partitions of `week` and restore display order.
fn merge_days(week: &[Task], replaced: Vec<(Day, Vec<Task>)>) -> Vec<Task> {
    let mut merged: Vec<Task> = week
        .iter()
        .filter(|task| !replaced.iter().any(|(day, _)| *day == task.day))
        .cloned()
        .collect();
    for (_, tasks) in replaced {
        merged.extend(tasks);
    }
    position::sort_week(&mut merged);
    merged
}
