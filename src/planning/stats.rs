use serde::Serialize;

use crate::models::task::TaskStatus;

/// Derived completion statistics for a plan's task collection.
///
/// This is the single source of truth for `total_tasks`,
/// `completed_tasks`, and `completion_rate`: handlers recompute it from
/// the current task set whenever a task is created, updated, deleted,
/// or has its status patched. Nothing else derives these numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TaskStats {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub completion_rate: f64,
}

impl TaskStats {
    pub fn from_statuses<'a, I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = &'a TaskStatus>,
    {
        let mut total = 0i64;
        let mut completed = 0i64;
        for status in statuses {
            total += 1;
            // Only `done` counts; every other status (including
            // cancelled) is "not done".
            if *status == TaskStatus::Done {
                completed += 1;
            }
        }
        Self {
            total_tasks: total,
            completed_tasks: completed,
            completion_rate: percentage(completed, total),
        }
    }

}

/// `completed / total * 100`, rounded to two decimals, 0 when total is 0.
pub fn percentage(completed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round2(completed as f64 / total as f64 * 100.0)
}

/// Completion rate of a goal: `current / target * 100`, two decimals.
///
/// Deliberately not capped at 100 — over-completion displays as >100%.
pub fn goal_completion_rate(current_value: f64, target_value: f64) -> f64 {
    if target_value <= 0.0 {
        return 0.0;
    }
    round2(current_value / target_value * 100.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::TaskStatus;

    fn stats_of(statuses: &[TaskStatus]) -> TaskStats {
        TaskStats::from_statuses(statuses.iter())
    }

    #[test]
    fn test_empty_task_set_has_zero_rate() {
        let stats = stats_of(&[]);
        assert_eq!(stats.total_tasks, 0);
        assert_eq!(stats.completed_tasks, 0);
        assert_eq!(stats.completion_rate, 0.0);
    }

    #[test]
    fn test_only_done_counts_as_completed() {
        let stats = stats_of(&[
            TaskStatus::Todo,
            TaskStatus::InProgress,
            TaskStatus::Done,
            TaskStatus::Cancelled,
        ]);
        assert_eq!(stats.total_tasks, 4);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.completion_rate, 25.0);
    }

    #[test]
    fn test_completed_never_exceeds_total() {
        let stats = stats_of(&[TaskStatus::Done, TaskStatus::Done, TaskStatus::Done]);
        assert!(stats.completed_tasks <= stats.total_tasks);
        assert_eq!(stats.completion_rate, 100.0);
    }

    #[test]
    fn test_rate_rounds_to_two_decimals() {
        // 1/3 -> 33.33, 2/3 -> 66.67
        let stats = stats_of(&[TaskStatus::Done, TaskStatus::Todo, TaskStatus::Todo]);
        assert_eq!(stats.completion_rate, 33.33);
        let stats = stats_of(&[TaskStatus::Done, TaskStatus::Done, TaskStatus::Todo]);
        assert_eq!(stats.completion_rate, 66.67);
    }

    #[test]
    fn test_status_toggle_is_idempotent() {
        let before = stats_of(&[TaskStatus::Done, TaskStatus::Todo]);
        // done -> todo
        let toggled = stats_of(&[TaskStatus::Todo, TaskStatus::Todo]);
        assert_eq!(toggled.completed_tasks, 0);
        // todo -> done restores the original stats
        let restored = stats_of(&[TaskStatus::Done, TaskStatus::Todo]);
        assert_eq!(restored, before);
    }

    #[test]
    fn test_goal_completion_rate() {
        assert_eq!(goal_completion_rate(7.0, 10.0), 70.0);
        assert_eq!(goal_completion_rate(0.0, 10.0), 0.0);
        assert_eq!(goal_completion_rate(5.0, 0.0), 0.0);
        // over-completion is allowed to exceed 100
        assert_eq!(goal_completion_rate(12.0, 10.0), 120.0);
    }
}
