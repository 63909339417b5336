use crate::clock::format_timestamp;
use crate::error::AppError;
use crate::model::{Priority, Task, TaskStatus};
use crate::query::DUE_SOON_DAYS;
use serde::Serialize;
use std::collections::BTreeMap;
use time::{Duration, OffsetDateTime};

const ACTIVITY_WINDOW_DAYS: i64 = 7;

/// Read-only summary of a task collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub status_counts: BTreeMap<TaskStatus, usize>,
    pub priority_counts: BTreeMap<Priority, usize>,
    pub categories: BTreeMap<String, usize>,
    pub completion_rate: f64,
    pub overdue: usize,
    pub due_today: usize,
    pub due_this_week: usize,
    pub created_this_week: usize,
    pub completed_this_week: usize,
}

impl Statistics {
    /// No tasks at all; callers report this instead of a 0% completion rate.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn status_count(&self, status: TaskStatus) -> usize {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }

    pub fn priority_count(&self, priority: Priority) -> usize {
        self.priority_counts.get(&priority).copied().unwrap_or(0)
    }
}

/// Aggregates `tasks` as seen at `now`. `date_format` must be the pattern the
/// timestamps were written with, since weekly activity compares stamps as
/// strings against a cutoff rendered the same way.
pub fn compute_statistics(
    tasks: &[Task],
    now: OffsetDateTime,
    date_format: &str,
) -> Result<Statistics, AppError> {
    let today = now.date();
    let cutoff = format_timestamp(now - Duration::days(ACTIVITY_WINDOW_DAYS), date_format)?;

    let mut status_counts: BTreeMap<TaskStatus, usize> =
        TaskStatus::ALL.into_iter().map(|status| (status, 0)).collect();
    let mut priority_counts: BTreeMap<Priority, usize> =
        Priority::ALL.into_iter().map(|priority| (priority, 0)).collect();
    let mut categories: BTreeMap<String, usize> = BTreeMap::new();
    let (mut overdue, mut due_today, mut due_this_week) = (0, 0, 0);
    let (mut created_this_week, mut completed_this_week) = (0, 0);

    for task in tasks {
        *status_counts.entry(task.status).or_default() += 1;
        *priority_counts.entry(task.priority).or_default() += 1;
        *categories.entry(task.category.clone()).or_default() += 1;

        if let Some(due) = task.due_date {
            match (due - today).whole_days() {
                days if days < 0 => overdue += 1,
                0 => due_today += 1,
                1..=DUE_SOON_DAYS => due_this_week += 1,
                _ => {}
            }
        }

        if task.created_at >= cutoff {
            created_this_week += 1;
        }
        if task.status == TaskStatus::Done && task.updated_at >= cutoff {
            completed_this_week += 1;
        }
    }

    let total = tasks.len();
    let done = status_counts.get(&TaskStatus::Done).copied().unwrap_or(0);

    Ok(Statistics {
        total,
        status_counts,
        priority_counts,
        categories,
        completion_rate: completion_rate(done, total),
        overdue,
        due_today,
        due_this_week,
        created_this_week,
        completed_this_week,
    })
}

fn completion_rate(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (done as f64 * 1000.0 / total as f64).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::compute_statistics;
    use crate::config::DEFAULT_DATE_FORMAT;
    use crate::model::{Priority, Task, TaskStatus};
    use time::macros::{date, datetime};

    fn task(id: u64, status: TaskStatus, category: &str, stamp: &str) -> Task {
        Task {
            id,
            description: format!("Task {id}"),
            status,
            category: category.to_string(),
            priority: Priority::Medium,
            due_date: None,
            created_at: stamp.to_string(),
            updated_at: stamp.to_string(),
        }
    }

    #[test]
    fn completion_rate_rounds_to_one_decimal() {
        let stamp = "2025-07-20 09:00:00.000000";
        let tasks = vec![
            task(1, TaskStatus::Done, "work", stamp),
            task(2, TaskStatus::Todo, "work", stamp),
            task(3, TaskStatus::Todo, "home", stamp),
        ];

        let stats =
            compute_statistics(&tasks, datetime!(2025-07-22 10:00 UTC), DEFAULT_DATE_FORMAT)
                .unwrap();

        assert_eq!(stats.total, 3);
        assert!((stats.completion_rate - 33.3).abs() < 0.1);
        assert_eq!(stats.status_count(TaskStatus::Done), 1);
        assert_eq!(stats.status_count(TaskStatus::InProgress), 0);
        assert_eq!(stats.status_counts.len(), 3);
        assert_eq!(stats.priority_count(Priority::Medium), 3);
        assert_eq!(stats.priority_count(Priority::High), 0);
        assert_eq!(stats.categories.get("work"), Some(&2));
        assert_eq!(stats.categories.get("home"), Some(&1));
        assert_eq!(stats.categories.len(), 2);
    }

    #[test]
    fn empty_collection_is_flagged() {
        let stats =
            compute_statistics(&[], datetime!(2025-07-22 10:00 UTC), DEFAULT_DATE_FORMAT).unwrap();

        assert!(stats.is_empty());
        assert_eq!(stats.completion_rate, 0.0);
        assert_eq!(stats.status_counts.values().sum::<usize>(), 0);
        assert!(stats.categories.is_empty());
    }

    #[test]
    fn due_buckets_split_by_day_distance() {
        let stamp = "2025-07-20 09:00:00.000000";
        let due = [
            Some(date!(2025 - 07 - 21)),
            Some(date!(2025 - 07 - 22)),
            Some(date!(2025 - 07 - 23)),
            Some(date!(2025 - 07 - 29)),
            Some(date!(2025 - 07 - 30)),
            None,
        ];
        let tasks: Vec<Task> = due
            .iter()
            .enumerate()
            .map(|(index, due_date)| Task {
                due_date: *due_date,
                ..task(index as u64 + 1, TaskStatus::Todo, "general", stamp)
            })
            .collect();

        let stats =
            compute_statistics(&tasks, datetime!(2025-07-22 18:30 UTC), DEFAULT_DATE_FORMAT)
                .unwrap();

        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.due_today, 1);
        assert_eq!(stats.due_this_week, 2);
    }

    #[test]
    fn weekly_activity_uses_cutoff_stamp() {
        let mut recent_done = task(1, TaskStatus::Done, "general", "2025-07-01 09:00:00.000000");
        recent_done.updated_at = "2025-07-21 09:00:00.000000".to_string();
        let tasks = vec![
            recent_done,
            task(2, TaskStatus::Todo, "general", "2025-07-20 09:00:00.000000"),
            task(3, TaskStatus::Done, "general", "2025-07-10 09:00:00.000000"),
        ];

        let stats =
            compute_statistics(&tasks, datetime!(2025-07-22 10:00 UTC), DEFAULT_DATE_FORMAT)
                .unwrap();

        assert_eq!(stats.created_this_week, 1);
        assert_eq!(stats.completed_this_week, 1);
    }

    #[test]
    fn serializes_counts_by_label() {
        let tasks = vec![task(1, TaskStatus::InProgress, "work", "2025-07-20 09:00:00.000000")];
        let stats =
            compute_statistics(&tasks, datetime!(2025-07-22 10:00 UTC), DEFAULT_DATE_FORMAT)
                .unwrap();

        let value = serde_json::to_value(&stats).unwrap();

        assert_eq!(value["status_counts"]["in-progress"], 1);
        assert_eq!(value["priority_counts"]["high"], 0);
        assert_eq!(value["categories"]["work"], 1);
    }
}
