use std::collections::BTreeMap;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use task_core::clock::parse_timestamp_format;
use task_core::config::{Config, colorize};
use task_core::model::{Priority, Task, TaskStatus};
use task_core::stats::Statistics;
use time::format_description::OwnedFormatItem;
use time::{Date, PrimitiveDateTime};

const DESCRIPTION_WIDTH: usize = 40;

/// Turns core values into terminal text using the configured colours and
/// display date format.
#[derive(Debug, Clone)]
pub struct Renderer {
    colors: Option<BTreeMap<String, String>>,
    stored_format: Option<OwnedFormatItem>,
    display_format: Option<OwnedFormatItem>,
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl Renderer {
    pub fn new(config: &Config, color: bool) -> Self {
        Self {
            colors: color.then(|| config.colors.clone()),
            stored_format: parse_timestamp_format(&config.date_format).ok(),
            display_format: parse_timestamp_format(&config.display_date_format).ok(),
        }
    }

    fn paint(&self, text: &str) -> String {
        let color = self
            .colors
            .as_ref()
            .and_then(|colors| colors.get(text))
            .map(String::as_str);
        colorize(text, color)
    }

    pub fn status(&self, status: TaskStatus) -> String {
        self.paint(status.label())
    }

    pub fn priority(&self, priority: Priority) -> String {
        self.paint(priority.label())
    }

    /// Re-renders a stored timestamp in the display format; stamps that do
    /// not parse are shown as stored.
    pub fn stamp(&self, raw: &str) -> String {
        let (Some(stored), Some(display)) = (&self.stored_format, &self.display_format) else {
            return raw.to_string();
        };
        PrimitiveDateTime::parse(raw, stored)
            .ok()
            .and_then(|moment| moment.format(display).ok())
            .unwrap_or_else(|| raw.to_string())
    }

    pub fn task_table(&self, tasks: &[Task], today: Date) -> String {
        let rows = tasks.iter().map(|task| TaskRow {
            id: task.id,
            description: truncate(&task.description, DESCRIPTION_WIDTH),
            status: self.status(task.status),
            priority: self.priority(task.priority),
            category: task.category.clone(),
            due: describe_due(task.due_date, today),
            updated: self.stamp(&task.updated_at),
        });

        let mut table = Table::new(rows);
        table.with(Style::rounded());
        table.to_string()
    }

    pub fn statistics(&self, stats: &Statistics) -> String {
        let mut lines = vec![
            "Task Statistics".to_string(),
            "===============".to_string(),
            format!("Total tasks: {}", stats.total),
            format!("Completion rate: {:.1}%", stats.completion_rate),
            String::new(),
            "By status:".to_string(),
        ];
        for status in TaskStatus::ALL {
            lines.push(format!("  {}: {}", self.status(status), stats.status_count(status)));
        }

        lines.push(String::new());
        lines.push("By priority:".to_string());
        for priority in Priority::ALL.into_iter().rev() {
            lines.push(format!(
                "  {}: {}",
                self.priority(priority),
                stats.priority_count(priority)
            ));
        }

        lines.push(String::new());
        lines.push("By category:".to_string());
        for (category, count) in &stats.categories {
            lines.push(format!("  {category}: {count}"));
        }

        lines.push(String::new());
        lines.push("Due dates:".to_string());
        lines.push(format!("  Overdue: {}", stats.overdue));
        lines.push(format!("  Due today: {}", stats.due_today));
        lines.push(format!("  Due this week: {}", stats.due_this_week));

        lines.push(String::new());
        lines.push("Last 7 days:".to_string());
        lines.push(format!("  Created: {}", stats.created_this_week));
        lines.push(format!("  Completed: {}", stats.completed_this_week));

        lines.join("\n")
    }
}

pub fn describe_due(due: Option<Date>, today: Date) -> String {
    let Some(due) = due else {
        return "-".to_string();
    };
    match (due - today).whole_days() {
        days if days < 0 => format!("Overdue ({} days)", -days),
        0 => "Due today".to_string(),
        1 => "Due tomorrow".to_string(),
        days => format!("Due in {days} days"),
    }
}

/// Shortens `text` to `max` characters, marking the cut with "...".
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
