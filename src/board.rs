//! Board facade over one week plan.
//!
//! Every operation edits the cached snapshots first, then hands the backend
//! call to the [`SyncCoordinator`]. Callers see the new state immediately;
//! a failed call later replaces it with whatever the backend reports.

use chrono::Utc;
use tracing::debug;

use crate::categories::{self, CategoryAdjustment};
use crate::error::Result;
use crate::model::{Category, CreateTask, Day, Task, TaskId, UpdateTask, WeekPlan};
use crate::position::{self, POSITION_STEP};
use crate::reorder::{self, MoveContext, MoveKind, MoveOutcome, MoveRequest};
use crate::store::{CacheKey, TaskStore};
use crate::sync::{SyncCoordinator, SyncOp, SyncRequest, SyncState};

#[derive(Clone)]
pub struct Board {
    sync: SyncCoordinator,
    week: WeekPlan,
    step: i64,
}

impl Board {
    /// Board for a known week plan. Snapshots load lazily via [`Board::load`].
    pub fn new(sync: SyncCoordinator, week: WeekPlan) -> Self {
        Self {
            sync,
            week,
            step: POSITION_STEP,
        }
    }

    /// Fetch the week plan and make sure its snapshots are cached.
    pub async fn open(sync: SyncCoordinator, week_id: &str) -> Result<Self> {
        let week = sync.backend().week_plan(week_id).await?;
        let board = Self::new(sync, week);
        board.load().await?;
        Ok(board)
    }

    pub fn with_step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    /// Load any of week, archive and categories that are not cached.
    pub async fn load(&self) -> Result<()> {
        self.sync.ensure_loaded(&self.week_key()).await?;
        self.sync.ensure_loaded(&CacheKey::Archive).await?;
        self.sync.ensure_loaded(&CacheKey::Categories).await?;
        Ok(())
    }

    /// Refetch every entry a failed sync left stale, waiting for the result.
    pub async fn refresh_stale(&self) -> Result<()> {
        for key in [self.week_key(), CacheKey::Archive, CacheKey::Categories] {
            if self.store().is_stale(&key) {
                self.sync.refresh(&key).await?;
            }
        }
        Ok(())
    }

    pub fn week(&self) -> &WeekPlan {
        &self.week
    }

    pub fn week_key(&self) -> CacheKey {
        CacheKey::week(self.week.id.clone())
    }

    pub fn coordinator(&self) -> &SyncCoordinator {
        &self.sync
    }

    fn store(&self) -> &TaskStore {
        self.sync.store()
    }

    fn context(&self) -> MoveContext {
        MoveContext {
            week_start: Some(self.week.start_date),
            step: self.step,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================
    //
    // A read of a stale entry returns nothing and starts a background refetch.

    fn read_tasks(&self, key: &CacheKey) -> Option<Vec<Task>> {
        self.sync.refresh_if_stale(key);
        self.store().read_tasks(key)
    }

    /// Every task of the week in display order.
    pub fn tasks(&self) -> Vec<Task> {
        self.read_tasks(&self.week_key()).unwrap_or_default()
    }

    pub fn day(&self, day: Day) -> Vec<Task> {
        position::day_partition(&self.tasks(), day)
    }

    pub fn archived(&self) -> Vec<Task> {
        self.read_tasks(&CacheKey::Archive).unwrap_or_default()
    }

    /// Look a task up in the week, then the archive.
    pub fn task(&self, task_id: &TaskId) -> Option<Task> {
        self.locate(task_id).map(|(_, task)| task)
    }

    pub fn categories(&self) -> Vec<Category> {
        self.sync.refresh_if_stale(&CacheKey::Categories);
        self.store().read_categories().unwrap_or_default()
    }

    pub fn sync_state(&self, task_id: &TaskId) -> SyncState {
        self.sync.state(task_id)
    }

    fn locate(&self, task_id: &TaskId) -> Option<(CacheKey, Task)> {
        [self.week_key(), CacheKey::Archive]
            .into_iter()
            .find_map(|key| {
                let task = self
                    .read_tasks(&key)?
                    .into_iter()
                    .find(|task| task.id == *task_id)?;
                Some((key, task))
            })
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Apply a drop. Returns the kind of move made, or `None` for a no-op.
    pub fn move_task(&self, request: &MoveRequest) -> Option<MoveKind> {
        self.apply_move(request, None)
    }

    /// Move a week task to the archive.
    pub fn archive_task(&self, task_id: &TaskId, reason: Option<String>) -> Option<MoveKind> {
        self.apply_move(&MoveRequest::to_archive(task_id.clone()), reason)
    }

    fn apply_move(&self, request: &MoveRequest, reason: Option<String>) -> Option<MoveKind> {
        let outcome = reorder::plan(request, &self.tasks(), &self.archived(), &self.context())?;
        let MoveOutcome {
            kind,
            week,
            archive,
            moved,
            adjustments,
        } = outcome;
        debug_assert!(Day::all().all(|day| {
            position::has_unique_positions(&position::day_partition(&week, day))
        }));

        self.store().write_tasks(&self.week_key(), |_| week);
        if let Some(mut archive) = archive {
            if kind == MoveKind::Archive {
                for task in archive.iter_mut().filter(|task| task.id == moved.id) {
                    task.archive_reason = reason.clone();
                }
            }
            self.store().write_tasks(&CacheKey::Archive, |_| archive);
        }
        let touched = self.adjust_categories(&adjustments);

        let op = match kind {
            MoveKind::Archive => SyncOp::Archive {
                task_id: moved.id.clone(),
                reason,
            },
            MoveKind::Unarchive => SyncOp::Unarchive {
                task_id: moved.id.clone(),
                target_task_id: request.target_task_id.clone(),
            },
            MoveKind::WithinDay | MoveKind::CrossDay | MoveKind::ToEmptyDay => SyncOp::Move {
                task_id: moved.id.clone(),
                target_task_id: request.target_task_id.clone(),
            },
        };
        debug!(task = %moved.id, %kind, day = %moved.day, position = moved.position, "move applied");
        self.submit(op, touched);
        Some(kind)
    }

    /// Insert a task at the end of its day under a temporary id.
    ///
    /// The id is swapped for the server's once the create is confirmed.
    pub fn create_task(&self, mut input: CreateTask) -> TaskId {
        let id = TaskId::temporary();
        input.date = self.week.date_for(input.day);

        let day = input.day;
        let mut day_tasks = self.day(day);
        day_tasks.push(input.to_task(id.clone(), Utc::now()));
        position::renumber_with_step(&mut day_tasks, self.step);
        let Some(placed) = day_tasks.iter().find(|task| task.id == id).cloned() else {
            return id;
        };
        input.position = placed.position;
        let adjustments: Vec<CategoryAdjustment> =
            CategoryAdjustment::added(&placed).into_iter().collect();

        self.store()
            .write_tasks(&self.week_key(), |old| replace_day(old, day, day_tasks));
        let touched = self.adjust_categories(&adjustments);
        debug!(task = %id, %day, position = input.position, "task created optimistically");
        self.submit(
            SyncOp::Create {
                temp_id: id.clone(),
                input,
            },
            touched,
        );
        id
    }

    /// Apply a partial edit. Returns `false` if the task is unknown or the
    /// edit is empty.
    pub fn update_task(&self, task_id: &TaskId, changes: UpdateTask) -> bool {
        if changes.is_empty() {
            return false;
        }
        let Some((key, before)) = self.locate(task_id) else {
            debug!(task = %task_id, "update for unknown task ignored");
            return false;
        };
        let mut after = before.clone();
        changes.apply_to(&mut after);
        let adjustments = categories::for_update(&before, &after);

        self.store().write_tasks(&key, |old| {
            old.unwrap_or_default()
                .iter()
                .map(|task| {
                    if task.id == *task_id {
                        after.clone()
                    } else {
                        task.clone()
                    }
                })
                .collect()
        });
        let touched = self.adjust_categories(&adjustments);
        self.submit(
            SyncOp::Update {
                task_id: task_id.clone(),
                changes,
            },
            touched,
        );
        true
    }

    /// Remove a task from its partition and close the gap.
    pub fn delete_task(&self, task_id: &TaskId) -> bool {
        let Some((key, removed)) = self.locate(task_id) else {
            debug!(task = %task_id, "delete for unknown task ignored");
            return false;
        };
        let step = self.step;

        if removed.archived {
            self.store().write_tasks(&key, |old| {
                let mut rest: Vec<Task> = old
                    .unwrap_or_default()
                    .iter()
                    .filter(|task| task.id != *task_id)
                    .cloned()
                    .collect();
                position::sort_by_position(&mut rest);
                position::renumber_with_step(&mut rest, step);
                rest
            });
        } else {
            let mut day_tasks = self.day(removed.day);
            day_tasks.retain(|task| task.id != *task_id);
            position::renumber_with_step(&mut day_tasks, step);
            self.store()
                .write_tasks(&key, |old| replace_day(old, removed.day, day_tasks));
        }

        let adjustments: Vec<CategoryAdjustment> = if removed.archived {
            Vec::new()
        } else {
            CategoryAdjustment::removed(&removed).into_iter().collect()
        };
        let touched = self.adjust_categories(&adjustments);
        self.submit(
            SyncOp::Delete {
                task_id: task_id.clone(),
                archived: removed.archived,
            },
            touched,
        );
        true
    }

    /// Wait until every queued call has been sent and settled.
    pub async fn settle(&self) {
        self.sync.drain().await;
    }

    fn submit(&self, op: SyncOp, touched_categories: bool) {
        let request = SyncRequest::new(self.week.id.clone(), op).with_categories(touched_categories);
        self.sync.submit(request);
    }

    /// Fold deltas into the cached categories. Returns whether anything changed.
    fn adjust_categories(&self, adjustments: &[CategoryAdjustment]) -> bool {
        if adjustments.is_empty() || self.store().read_categories().is_none() {
            return false;
        }
        self.store().write_categories(|old| {
            categories::apply_adjustments(old.unwrap_or_default(), adjustments)
        });
        true
    }
}

fn replace_day(old: Option<&[Task]>, day: Day, day_tasks: Vec<Task>) -> Vec<Task> {
    let mut week: Vec<Task> = old
        .unwrap_or_default()
        .iter()
        .filter(|task| task.day != day)
        .cloned()
        .collect();
    week.extend(day_tasks);
    position::sort_week(&mut week);
    week
}
