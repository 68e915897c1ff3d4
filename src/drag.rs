//! Drag interaction adapter.
//!
//! Translates pointer events into board operations and keeps the transient
//! state a UI needs to draw the drag: the active task and the drop line.

use tracing::debug;

use crate::board::Board;
use crate::model::{Day, Task, TaskId};
use crate::reorder::{relative_side, MoveKind, MoveRequest, Side};

/// A droppable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Day(Day),
    Archive,
}

impl Container {
    pub fn of(task: &Task) -> Self {
        if task.archived {
            Container::Archive
        } else {
            Container::Day(task.day)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    Task(TaskId),
    Container(Container),
}

/// Where the drop indicator is drawn. `side` is set when hovering a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropLine {
    pub target: DropTarget,
    pub side: Option<Side>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveDrag {
    pub task_id: TaskId,
    pub origin: Container,
}

pub struct DragAdapter {
    board: Board,
    active: Option<ActiveDrag>,
    drop_line: Option<DropLine>,
}

impl DragAdapter {
    pub fn new(board: Board) -> Self {
        Self {
            board,
            active: None,
            drop_line: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn active(&self) -> Option<&ActiveDrag> {
        self.active.as_ref()
    }

    pub fn drop_line(&self) -> Option<&DropLine> {
        self.drop_line.as_ref()
    }

    /// Begin dragging `task_id`. Returns `false` if the task is not on the board.
    pub fn drag_start(&mut self, task_id: &TaskId) -> bool {
        let Some(task) = self.board.task(task_id) else {
            debug!(task = %task_id, "drag start on unknown task ignored");
            return false;
        };
        self.active = Some(ActiveDrag {
            task_id: task.id.clone(),
            origin: Container::of(&task),
        });
        self.drop_line = None;
        true
    }

    /// Pointer moved over `target` (or over nothing).
    ///
    /// Crossing into another day moves a week task there right away, appended
    /// at the end. The move syncs through the debounce, so passing over
    /// several days sends a single call.
    pub fn drag_over(&mut self, target: Option<DropTarget>) {
        let Some(active) = self.active.clone() else {
            return;
        };
        let Some(target) = target else {
            self.drop_line = None;
            return;
        };
        let Some(task) = self.board.task(&active.task_id) else {
            // Refetched away mid-drag.
            self.clear();
            return;
        };
        if target == DropTarget::Task(task.id.clone()) {
            self.drop_line = None;
            return;
        }

        let container = match &target {
            DropTarget::Task(anchor_id) => match self.board.task(anchor_id) {
                Some(anchor) => Container::of(&anchor),
                None => {
                    self.drop_line = None;
                    return;
                }
            },
            DropTarget::Container(container) => *container,
        };

        if let Container::Day(day) = container {
            if !task.archived && task.day != day {
                self.board
                    .move_task(&MoveRequest::to_day(task.id.clone(), day));
            }
        }

        // The side is read after the hover move, as the drop will see it.
        let side = match &target {
            DropTarget::Task(anchor_id) => self
                .board
                .task(&task.id)
                .zip(self.board.task(anchor_id))
                .map(|(moved, anchor)| relative_side(&moved, &anchor)),
            DropTarget::Container(_) => None,
        };
        self.drop_line = Some(DropLine { target, side });
    }

    /// Drop. Applies the final move and clears transient state.
    ///
    /// Returns the kind of move made by the drop itself; a drop that only
    /// confirms where a cross-day hover already placed the task yields `None`.
    pub fn drag_end(&mut self, target: Option<DropTarget>) -> Option<MoveKind> {
        let active = self.active.take();
        self.drop_line = None;
        let active = active?;
        let Some(target) = target else {
            debug!(task = %active.task_id, "drop outside any target, treated as cancel");
            return None;
        };
        let task = self.board.task(&active.task_id)?;

        match target {
            DropTarget::Container(Container::Archive) => self.board.archive_task(&task.id, None),
            DropTarget::Container(Container::Day(day)) => {
                self.board.move_task(&MoveRequest::to_day(task.id, day))
            }
            DropTarget::Task(anchor_id) => {
                let anchor = self.board.task(&anchor_id)?;
                if anchor.archived {
                    if task.archived {
                        return None;
                    }
                    return self.board.archive_task(&task.id, None);
                }
                self.board
                    .move_task(&MoveRequest::to_day(task.id, anchor.day).with_target(anchor_id))
            }
        }
    }

    pub fn drag_cancel(&mut self) {
        if let Some(active) = &self.active {
            debug!(task = %active.task_id, "drag cancelled");
        }
        self.clear();
    }

    fn clear(&mut self) {
        self.active = None;
        self.drop_line = None;
    }
}
