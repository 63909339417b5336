use clap::{Args, Parser, Subcommand};
use task_core::TaskDraft;
use task_core::config::Config;
use task_core::error::AppError;
use task_core::model::Priority;
use task_core::query::TaskFilter;

#[derive(Parser, Debug)]
#[command(
    name = "task_cli",
    author,
    version,
    about = "Track tasks in a local JSON file",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable coloured output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
}

/// Optional task fields shared by `add` and `update`.
#[derive(Args, Debug, Clone, Default)]
pub struct TaskFields {
    /// Category name (stored lowercase)
    #[arg(long)]
    pub category: Option<String>,

    /// Priority: low, medium or high
    #[arg(long)]
    pub priority: Option<String>,

    /// Due date in YYYY-MM-DD format
    #[arg(long = "due", value_name = "YYYY-MM-DD")]
    pub due: Option<String>,
}

impl TaskFields {
    pub fn into_draft(self, description: String) -> TaskDraft {
        TaskDraft {
            description,
            category: self.category,
            priority: self.priority,
            due_date: self.due,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: task_cli add "Buy groceries" --category shopping --priority high --due 2025-08-01
    Add {
        description: String,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Update a task's description and, optionally, its other fields
    ///
    /// Example: task_cli update 1 "Buy groceries and cook dinner"
    Update {
        id: u64,
        description: String,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Delete a task
    ///
    /// Example: task_cli delete 1
    Delete { id: u64 },
    /// Mark a task as in progress
    ///
    /// Example: task_cli mark-in-progress 1
    MarkInProgress { id: u64 },
    /// Mark a task as done
    ///
    /// Example: task_cli mark-done 1
    MarkDone { id: u64 },
    /// List tasks, optionally filtered by status
    ///
    /// Example: task_cli list todo --priority high --sort due_date
    List {
        /// todo, in-progress or done
        status: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        /// Only tasks due within the next 7 days (overdue included)
        #[arg(long)]
        due_soon: bool,
        /// id, description, status, priority, category, created, updated or due_date
        #[arg(long, default_value = "id")]
        sort: String,
        #[arg(long)]
        reverse: bool,
        /// Show one page of `tasks_per_page` results (1-based)
        #[arg(long)]
        page: Option<usize>,
    },
    /// Search task descriptions
    ///
    /// Example: task_cli search groceries --status todo
    Search {
        query: String,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        priority: Option<String>,
    },
    /// Show task statistics
    Stats,
    /// List backups of the data file, newest first
    Backups,
}

/// Builds a query filter from raw command-line values. Statuses are checked
/// against `config.valid_statuses`.
pub fn build_filter(
    config: &Config,
    status: Option<&str>,
    category: Option<&str>,
    priority: Option<&str>,
    due_soon: bool,
) -> Result<TaskFilter, AppError> {
    Ok(TaskFilter {
        status: status.map(|raw| config.parse_status(raw)).transpose()?,
        category: category
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string),
        priority: priority.map(str::parse::<Priority>).transpose()?,
        due_soon,
    })
}

/// Returns the 1-based `page` of `items`, or an error naming the valid range.
pub fn page_slice<T>(items: &[T], page: usize, per_page: usize) -> Result<&[T], AppError> {
    let per_page = per_page.max(1);
    let pages = page_count(items.len(), per_page);
    if page == 0 || page > pages {
        return Err(AppError::invalid_input(format!(
            "Page {page} is out of range. Valid pages are 1 to {pages}."
        )));
    }
    let start = (page - 1) * per_page;
    let end = (start + per_page).min(items.len());
    Ok(&items[start..end])
}

pub fn page_count(len: usize, per_page: usize) -> usize {
    len.div_ceil(per_page.max(1)).max(1)
}
