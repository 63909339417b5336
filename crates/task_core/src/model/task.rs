use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

pub const DEFAULT_CATEGORY: &str = "general";

/// Wire and input format for due dates.
pub const DUE_DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub description: String,
    pub status: TaskStatus,
    pub category: String,
    pub priority: Priority,
    #[serde(with = "due_date_serde")]
    pub due_date: Option<Date>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn label(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let cleaned = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.label() == cleaned)
            .ok_or_else(|| {
                AppError::invalid_input(format!(
                    "Invalid status '{}'. Valid statuses are: {}",
                    raw.trim(),
                    join_labels(Self::ALL.iter().map(|status| status.label()))
                ))
            })
    }
}

/// Declaration order is the severity rank used for sorting.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let cleaned = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|priority| priority.label() == cleaned)
            .ok_or_else(|| {
                AppError::invalid_input(format!(
                    "Invalid priority '{}'. Valid priorities are: {}",
                    raw.trim(),
                    join_labels(Self::ALL.iter().map(|priority| priority.label()))
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub version: String,
    pub created: String,
    pub last_modified: String,
}

pub fn parse_due_date(raw: &str) -> Result<Date, AppError> {
    let trimmed = raw.trim();
    Date::parse(trimmed, DUE_DATE_FORMAT).map_err(|_| {
        AppError::invalid_input(format!(
            "Invalid due date format '{trimmed}'. Use YYYY-MM-DD"
        ))
    })
}

/// Lowercases and trims a category, falling back to the default bucket.
pub fn normalize_category(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_lowercase(),
        _ => DEFAULT_CATEGORY.to_string(),
    }
}

pub(crate) fn join_labels<'a>(labels: impl Iterator<Item = &'a str>) -> String {
    labels.collect::<Vec<_>>().join(", ")
}

mod due_date_serde {
    use super::DUE_DATE_FORMAT;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(value: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => {
                let text = date
                    .format(DUE_DATE_FORMAT)
                    .map_err(serde::ser::Error::custom)?;
                serializer.serialize_some(&text)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Date>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|text| Date::parse(&text, DUE_DATE_FORMAT).map_err(serde::de::Error::custom))
            .transpose()
    }
}
