use crate::clock::{Clock, SystemClock, format_timestamp};
use crate::config::Config;
use crate::error::AppError;
use crate::model::{
    Priority, StoreMetadata, Task, TaskStatus, join_labels, normalize_category, parse_due_date,
};
use crate::query::{self, SortKey, TaskFilter};
use crate::stats::{self, Statistics};
use crate::storage::backup::BackupManager;
use crate::storage::json_store::{self, StoreState};
use std::path::{Path, PathBuf};
use time::{Date, OffsetDateTime};

/// Fields supplied by the caller when adding or updating a task. Optional
/// values are raw user input; the store validates them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub description: String,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
}

impl TaskDraft {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Changed,
    /// The task already had the requested status; nothing was written.
    Unchanged,
}

/// The task collection for one process invocation, bound to a data file.
pub struct TaskStore {
    config: Config,
    path: PathBuf,
    state: StoreState,
    backups: BackupManager,
    clock: Box<dyn Clock>,
    load_warning: Option<AppError>,
}

impl TaskStore {
    pub fn open(config: Config) -> Result<Self, AppError> {
        Self::open_with_clock(config, Box::new(SystemClock))
    }

    /// Loads (and migrates) the configured data file. A corrupt file opens as
    /// an empty store; the reason is kept in [`TaskStore::load_warning`].
    pub fn open_with_clock(config: Config, clock: Box<dyn Clock>) -> Result<Self, AppError> {
        let stamp = format_timestamp(clock.now(), &config.date_format)?;
        let path = config.data_file.clone();
        let loaded = json_store::load_state_with_fallback(&path, &stamp);
        let backups = BackupManager::for_data_file(&path, config.backup_count);

        Ok(Self {
            config,
            path,
            state: loaded.state,
            backups,
            clock,
            load_warning: loaded.error,
        })
    }

    pub fn load_warning(&self) -> Option<&AppError> {
        self.load_warning.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn data_file(&self) -> &Path {
        &self.path
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.state.tasks.iter().find(|task| task.id == id)
    }

    pub fn next_id(&self) -> u64 {
        self.state.next_id
    }

    pub fn metadata(&self) -> &StoreMetadata {
        &self.state.metadata
    }

    pub fn today(&self) -> Date {
        self.clock.today()
    }

    pub fn add(&mut self, draft: TaskDraft) -> Result<Task, AppError> {
        let description = self.validate_description(&draft.description)?;
        let priority = match draft.priority.as_deref() {
            Some(raw) => self.validate_priority(raw)?,
            None => Priority::default(),
        };
        let due_date = draft.due_date.as_deref().map(parse_due_date).transpose()?;

        let id = self.state.next_id;
        let following = id
            .checked_add(1)
            .ok_or_else(|| AppError::invalid_data(format!("no task id is left after {id}")))?;

        let now = self.clock.now();
        let stamp = self.stamp(now)?;
        let mut next = self.state.clone();
        let task = Task {
            id,
            description,
            status: self.config.default_status,
            category: normalize_category(draft.category.as_deref()),
            priority,
            due_date,
            created_at: stamp.clone(),
            updated_at: stamp.clone(),
        };
        next.next_id = following;
        next.tasks.push(task.clone());

        self.persist(next, now, stamp)?;
        tracing::info!(id = task.id, "added task");
        Ok(task)
    }

    /// Replaces the description and any supplied optional fields; omitted
    /// fields keep their current values.
    pub fn update(&mut self, id: u64, draft: TaskDraft) -> Result<Task, AppError> {
        let description = self.validate_description(&draft.description)?;
        let index = self.position(id)?;
        let priority = draft
            .priority
            .as_deref()
            .map(|raw| self.validate_priority(raw))
            .transpose()?;
        let due_date = draft.due_date.as_deref().map(parse_due_date).transpose()?;

        let now = self.clock.now();
        let stamp = self.stamp(now)?;
        let mut next = self.state.clone();
        let task = &mut next.tasks[index];
        task.description = description;
        if let Some(category) = draft.category.as_deref() {
            task.category = normalize_category(Some(category));
        }
        if let Some(priority) = priority {
            task.priority = priority;
        }
        if due_date.is_some() {
            task.due_date = due_date;
        }
        task.updated_at = stamp.clone();
        let updated = task.clone();

        self.persist(next, now, stamp)?;
        tracing::info!(id, "updated task");
        Ok(updated)
    }

    /// Removes the task; `next_id` and every other id stay as they were.
    pub fn delete(&mut self, id: u64) -> Result<Task, AppError> {
        let index = self.position(id)?;

        let now = self.clock.now();
        let stamp = self.stamp(now)?;
        let mut next = self.state.clone();
        let removed = next.tasks.remove(index);

        self.persist(next, now, stamp)?;
        tracing::info!(id, "deleted task");
        Ok(removed)
    }

    pub fn mark_in_progress(&mut self, id: u64) -> Result<StatusChange, AppError> {
        self.set_status(id, TaskStatus::InProgress)
    }

    pub fn mark_done(&mut self, id: u64) -> Result<StatusChange, AppError> {
        self.set_status(id, TaskStatus::Done)
    }

    fn set_status(&mut self, id: u64, status: TaskStatus) -> Result<StatusChange, AppError> {
        let index = self.position(id)?;
        if self.state.tasks[index].status == status {
            return Ok(StatusChange::Unchanged);
        }

        let now = self.clock.now();
        let stamp = self.stamp(now)?;
        let mut next = self.state.clone();
        let task = &mut next.tasks[index];
        task.status = status;
        task.updated_at = stamp.clone();

        self.persist(next, now, stamp)?;
        tracing::info!(id, status = status.label(), "changed task status");
        Ok(StatusChange::Changed)
    }

    pub fn list(&self, filter: &TaskFilter, key: SortKey, reverse: bool) -> Vec<Task> {
        let mut tasks = query::filter_tasks(&self.state.tasks, filter, self.today());
        query::sort_tasks(&mut tasks, key, reverse);
        tasks
    }

    /// Description matches for `query`, narrowed by `filter`, in store order.
    pub fn search(&self, query: &str, filter: &TaskFilter) -> Vec<Task> {
        let matches = query::search_tasks(&self.state.tasks, query);
        query::filter_tasks(&matches, filter, self.today())
    }

    pub fn statistics(&self) -> Result<Statistics, AppError> {
        stats::compute_statistics(&self.state.tasks, self.clock.now(), &self.config.date_format)
    }

    fn position(&self, id: u64) -> Result<usize, AppError> {
        self.state
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| AppError::task_not_found(id))
    }

    fn validate_description(&self, raw: &str) -> Result<String, AppError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("Task description cannot be empty."));
        }
        let limit = self.config.max_description_length;
        if trimmed.chars().count() > limit {
            return Err(AppError::invalid_input(format!(
                "Task description exceeds maximum length of {limit} characters."
            )));
        }
        Ok(trimmed.to_string())
    }

    fn validate_priority(&self, raw: &str) -> Result<Priority, AppError> {
        let allowed = &self.config.valid_priorities;
        match raw.parse::<Priority>() {
            Ok(priority) if allowed.contains(&priority) => Ok(priority),
            _ => Err(AppError::invalid_input(format!(
                "Invalid priority '{}'. Valid priorities are: {}",
                raw.trim(),
                join_labels(allowed.iter().map(|priority| priority.label()))
            ))),
        }
    }

    fn stamp(&self, moment: OffsetDateTime) -> Result<String, AppError> {
        format_timestamp(moment, &self.config.date_format)
    }

    /// Backs up the current file, writes `next`, and only then adopts it, so
    /// a failed save leaves this store untouched.
    fn persist(
        &mut self,
        mut next: StoreState,
        now: OffsetDateTime,
        stamp: String,
    ) -> Result<(), AppError> {
        next.metadata.last_modified = stamp;
        if self.config.backup_enabled && self.path.is_file() {
            self.backups.backup_before_save(&self.path, now);
        }
        json_store::save_state(&self.path, &next)?;
        self.state = next;
        Ok(())
    }
}
