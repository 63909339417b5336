//! Search, filtering and ordering over a task slice.
//!
//! Every function here is pure: callers hand in the tasks and, where the
//! answer depends on the calendar, today's date.

use crate::error::AppError;
use crate::model::{Priority, Task, TaskStatus, join_labels};
use std::cmp::Ordering;
use std::str::FromStr;
use time::{Date, Duration};

/// Width of the "due soon" window, counted from today inclusive.
pub const DUE_SOON_DAYS: i64 = 7;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub due_soon: bool,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task, today: Date) -> bool {
        if let Some(status) = self.status
            && task.status != status
        {
            return false;
        }

        if let Some(category) = self.category.as_deref()
            && !task.category.eq_ignore_ascii_case(category.trim())
        {
            return false;
        }

        if let Some(priority) = self.priority
            && task.priority != priority
        {
            return false;
        }

        !self.due_soon || is_due_soon(task, today)
    }
}

/// True when the task has a due date on or before today + 7 days; overdue
/// tasks count as due soon.
pub fn is_due_soon(task: &Task, today: Date) -> bool {
    match task.due_date {
        Some(due) => due <= today.saturating_add(Duration::days(DUE_SOON_DAYS)),
        None => false,
    }
}

pub fn search_tasks(tasks: &[Task], query: &str) -> Vec<Task> {
    let needle = query.trim().to_lowercase();
    tasks
        .iter()
        .filter(|task| task.description.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

pub fn filter_tasks(tasks: &[Task], filter: &TaskFilter, today: Date) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| filter.matches(task, today))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Id,
    Description,
    Status,
    Priority,
    Category,
    Created,
    Updated,
    DueDate,
}

type Comparator = fn(&Task, &Task) -> Ordering;

impl SortKey {
    pub const ALL: [SortKey; 8] = [
        SortKey::Id,
        SortKey::Description,
        SortKey::Status,
        SortKey::Priority,
        SortKey::Category,
        SortKey::Created,
        SortKey::Updated,
        SortKey::DueDate,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Description => "description",
            Self::Status => "status",
            Self::Priority => "priority",
            Self::Category => "category",
            Self::Created => "created",
            Self::Updated => "updated",
            Self::DueDate => "due_date",
        }
    }

    fn comparator(self) -> Comparator {
        match self {
            Self::Id => |a, b| a.id.cmp(&b.id),
            Self::Description => {
                |a, b| a.description.to_lowercase().cmp(&b.description.to_lowercase())
            }
            Self::Status => |a, b| a.status.label().cmp(b.status.label()),
            Self::Priority => |a, b| a.priority.cmp(&b.priority),
            Self::Category => |a, b| a.category.cmp(&b.category),
            Self::Created => |a, b| a.created_at.cmp(&b.created_at),
            Self::Updated => |a, b| a.updated_at.cmp(&b.updated_at),
            // Missing due dates sort as if due at the end of time.
            Self::DueDate => |a, b| {
                a.due_date
                    .unwrap_or(Date::MAX)
                    .cmp(&b.due_date.unwrap_or(Date::MAX))
            },
        }
    }

    /// Resolves a user-supplied key. Unknown keys fall back to `id` and carry
    /// a warning instead of failing the command.
    pub fn select(raw: &str) -> SortSelection {
        match raw.parse() {
            Ok(key) => SortSelection { key, warning: None },
            Err(err) => {
                tracing::warn!(key = raw, "unknown sort key, sorting by id");
                SortSelection {
                    key: SortKey::Id,
                    warning: Some(err),
                }
            }
        }
    }
}

impl FromStr for SortKey {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let cleaned = raw.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|key| key.label() == cleaned)
            .ok_or_else(|| {
                AppError::invalid_input(format!(
                    "Invalid sort key '{}'. Valid keys are: {}. Sorting by id.",
                    raw.trim(),
                    join_labels(Self::ALL.iter().map(|key| key.label()))
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSelection {
    pub key: SortKey,
    pub warning: Option<AppError>,
}

/// Stable sort. `reverse` flips the full ordering, so tasks without a due
/// date come first when sorting by due date in reverse.
pub fn sort_tasks(tasks: &mut [Task], key: SortKey, reverse: bool) {
    let compare = key.comparator();
    if reverse {
        tasks.sort_by(|a, b| compare(b, a));
    } else {
        tasks.sort_by(compare);
    }
}
