//! Pure derivation of presentation views from a task snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::filter::{FilterSelection, StatusFilter, TaskOrder};
use crate::model::Task;

/// Counts shown alongside the task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewStats {
    pub active_count: usize,
    pub completed_count: usize,
    pub total: usize,
    /// Percentage of listed tasks that are complete, rounded. Absent when
    /// nothing is listed or everything is already complete.
    pub completion_rate: Option<u8>,
}

impl ViewStats {
    fn tally(active_count: usize, completed_count: usize) -> Self {
        let total = active_count + completed_count;
        let completion_rate = if total > 0 && active_count > 0 {
            Some(((completed_count as f64 / total as f64) * 100.0).round() as u8)
        } else {
            None
        };
        Self {
            active_count,
            completed_count,
            total,
            completion_rate,
        }
    }
}

/// Immutable output consumed by presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskView {
    pub active: Vec<Task>,
    pub completed: Vec<Task>,
    pub stats: ViewStats,
    /// True only when the snapshot itself holds nothing. A filter that
    /// matches nothing renders as empty sections, not the global empty state.
    pub is_empty: bool,
}

/// Compute the active/completed split, stats, and empty flag for a
/// selection. Pure: same inputs, same output, snapshot never mutated.
pub fn derive(snapshot: &[Task], selection: &FilterSelection, now: DateTime<Utc>) -> TaskView {
    let mut tasks: Vec<Task> = snapshot
        .iter()
        .filter(|task| matches_status(task, selection.status, now))
        .cloned()
        .collect();

    // period filtering is the service's job (the policy requeries whenever
    // period != all); locally it is a passthrough

    match selection.order {
        TaskOrder::CreatedAsc => tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        TaskOrder::CreatedDesc => tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        // sort_by is stable: equal ranks keep their snapshot order
        TaskOrder::PriorityDesc => {
            tasks.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank()))
        }
    }

    let (active, completed): (Vec<Task>, Vec<Task>) =
        tasks.into_iter().partition(|task| !task.complete);

    let stats = ViewStats::tally(active.len(), completed.len());

    TaskView {
        active,
        completed,
        stats,
        is_empty: snapshot.is_empty(),
    }
}

fn matches_status(task: &Task, status: StatusFilter, now: DateTime<Utc>) -> bool {
    match status {
        StatusFilter::All => true,
        StatusFilter::Active => !task.complete,
        StatusFilter::Completed => task.complete,
        StatusFilter::Overdue => task.is_overdue(now),
    }
}
