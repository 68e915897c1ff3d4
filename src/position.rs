//! Position allocation for ordered partitions.
//!
//! Every structural change renumbers the whole partition to `k * step`
//! instead of squeezing new values into gaps, so two tasks in a settled
//! partition never share a position.

use std::collections::HashSet;

use crate::model::{Day, Task};

/// Default spacing between consecutive positions.
pub const POSITION_STEP: i64 = 1000;

/// Renumber `tasks` in their current order using [`POSITION_STEP`].
pub fn renumber(tasks: &mut [Task]) {
    renumber_with_step(tasks, POSITION_STEP);
}

/// Assign `(k + 1) * step` to the k-th task.
///
/// Saturates at `i64::MAX` rather than wrapping.
pub fn renumber_with_step(tasks: &mut [Task], step: i64) {
    for (index, task) in tasks.iter_mut().enumerate() {
        let slot = i64::try_from(index).unwrap_or(i64::MAX).saturating_add(1);
        task.position = slot.saturating_mul(step);
    }
}

/// Display order within one partition.
///
/// Ties (only possible in unsettled server data) fall back to creation time
/// and then id so the order stays total.
pub fn sort_by_position(tasks: &mut [Task]) {
    tasks.sort_by(|left, right| {
        left.position
            .cmp(&right.position)
            .then_with(|| left.created_at.cmp(&right.created_at))
            .then_with(|| left.id.cmp(&right.id))
    });
}

/// Display order for a whole week: by day, then by position.
pub fn sort_week(tasks: &mut [Task]) {
    tasks.sort_by(|left, right| {
        left.day
            .cmp(&right.day)
            .then_with(|| left.position.cmp(&right.position))
            .then_with(|| left.created_at.cmp(&right.created_at))
            .then_with(|| left.id.cmp(&right.id))
    });
}

/// Tasks of one day in display order.
pub fn day_partition(week: &[Task], day: Day) -> Vec<Task> {
    let mut tasks: Vec<Task> = week.iter().filter(|task| task.day == day).cloned().collect();
    sort_by_position(&mut tasks);
    tasks
}

pub fn has_unique_positions(tasks: &[Task]) -> bool {
    let mut seen = HashSet::with_capacity(tasks.len());
    tasks.iter().all(|task| seen.insert(task.position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CreateTask, TaskId};
    use chrono::{TimeZone, Utc};

    fn task(id: &str, position: i64) -> Task {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("date");
        let mut task = CreateTask::new(id, Day::FIRST, at).to_task(TaskId::from(id), at);
        task.position = position;
        task
    }

    #[test]
    fn renumber_spaces_by_step() {
        let mut tasks = vec![task("a", 7), task("b", 7), task("c", 3)];
        renumber(&mut tasks);
        let positions: Vec<i64> = tasks.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![1000, 2000, 3000]);
        assert!(has_unique_positions(&tasks));
    }

    #[test]
    fn renumber_is_idempotent() {
        let mut tasks = vec![task("a", 5), task("b", 9000), task("c", 12)];
        renumber_with_step(&mut tasks, 10);
        let first = tasks.clone();
        renumber_with_step(&mut tasks, 10);
        assert_eq!(tasks, first);
    }

    #[test]
    fn sort_breaks_ties_by_id() {
        let mut tasks = vec![task("b", 1000), task("a", 1000), task("c", 500)];
        sort_by_position(&mut tasks);
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn renumber_with_huge_step_does_not_overflow() {
        let mut tasks = vec![task("a", 1), task("b", 2)];
        renumber_with_step(&mut tasks, i64::MAX / 2 + 1);
        assert_eq!(tasks[0].position, i64::MAX / 2 + 1);
        assert_eq!(tasks[1].position, i64::MAX);
        assert!(has_unique_positions(&tasks));
    }

    #[test]
    fn renumber_empty_is_noop() {
        let mut tasks: Vec<Task> = Vec::new();
        renumber(&mut tasks);
        assert!(tasks.is_empty());
        assert!(has_unique_positions(&tasks));
    }
}
