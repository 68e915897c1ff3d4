//! Incremental bookkeeping of category actual time.
//!
//! A category's actual time is the sum of the durations of its non-archived
//! tasks. Rather than recomputing it, every task mutation reports the delta
//! it causes and the deltas are folded into the cached category list.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Category, Task};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryAdjustment {
    pub category_id: String,
    /// Minutes added to (positive) or removed from (negative) actual time.
    pub delta: i64,
}

impl CategoryAdjustment {
    /// Delta for a task that starts counting (created or unarchived).
    ///
    /// Archive state is ignored; pass the task as it looks while counting.
    pub fn added(task: &Task) -> Option<Self> {
        let (category, minutes) = task.tracked_time(true)?;
        Some(Self {
            category_id: category.to_string(),
            delta: minutes,
        })
    }

    /// Delta for a task that stops counting (deleted or archived).
    pub fn removed(task: &Task) -> Option<Self> {
        let (category, minutes) = task.tracked_time(true)?;
        Some(Self {
            category_id: category.to_string(),
            delta: -minutes,
        })
    }
}

/// Deltas caused by editing `before` into `after`.
pub fn for_update(before: &Task, after: &Task) -> Vec<CategoryAdjustment> {
    let mut deltas: HashMap<String, i64> = HashMap::new();
    if let Some((category, minutes)) = before.tracked_time(false) {
        *deltas.entry(category.to_string()).or_insert(0) -= minutes;
    }
    if let Some((category, minutes)) = after.tracked_time(false) {
        *deltas.entry(category.to_string()).or_insert(0) += minutes;
    }
    let mut adjustments: Vec<CategoryAdjustment> = deltas
        .into_iter()
        .filter(|(_, delta)| *delta != 0)
        .map(|(category_id, delta)| CategoryAdjustment { category_id, delta })
        .collect();
    adjustments.sort_by(|left, right| left.category_id.cmp(&right.category_id));
    adjustments
}

/// Net change applied to one category by a set of adjustments.
pub fn net_delta(adjustments: &[CategoryAdjustment], category_id: &str) -> i64 {
    adjustments
        .iter()
        .filter(|adjustment| adjustment.category_id == category_id)
        .map(|adjustment| adjustment.delta)
        .sum()
}

/// Fold `adjustments` into a copy of `categories`.
///
/// Adjustments for unknown categories are dropped. Actual time never goes
/// below zero.
pub fn apply_adjustments(
    categories: &[Category],
    adjustments: &[CategoryAdjustment],
) -> Vec<Category> {
    categories
        .iter()
        .map(|category| {
            let delta = net_delta(adjustments, &category.id);
            let mut next = category.clone();
            next.actual_time = (category.actual_time + delta).max(0);
            next
        })
        .collect()
}
