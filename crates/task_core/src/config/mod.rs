use crate::clock::parse_timestamp_format;
use crate::error::AppError;
use crate::model::{Priority, TaskStatus, join_labels};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TASK_CLI_CONFIG_PATH";

pub const DATA_FILE_ENV_VAR: &str = "TASK_CLI_DATA_FILE";
pub const DATE_FORMAT_ENV_VAR: &str = "TASK_CLI_DATE_FORMAT";
pub const MAX_DESC_LENGTH_ENV_VAR: &str = "TASK_CLI_MAX_DESC_LENGTH";
pub const TASKS_PER_PAGE_ENV_VAR: &str = "TASK_CLI_TASKS_PER_PAGE";

pub const DEFAULT_DATE_FORMAT: &str =
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]";
pub const DEFAULT_DISPLAY_DATE_FORMAT: &str = "[year]-[month]-[day] [hour]:[minute]:[second]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_file: PathBuf,
    pub date_format: String,
    pub display_date_format: String,
    pub max_description_length: usize,
    pub tasks_per_page: usize,
    pub default_status: TaskStatus,
    pub valid_statuses: Vec<TaskStatus>,
    pub valid_priorities: Vec<Priority>,
    pub backup_enabled: bool,
    pub backup_count: usize,
    pub colors: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        let colors = [
            ("todo", "yellow"),
            ("in-progress", "blue"),
            ("done", "green"),
            ("high", "red"),
            ("medium", "yellow"),
            ("low", "cyan"),
        ]
        .into_iter()
        .map(|(key, color)| (key.to_string(), color.to_string()))
        .collect();

        Self {
            data_file: PathBuf::from("tasks.json"),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            display_date_format: DEFAULT_DISPLAY_DATE_FORMAT.to_string(),
            max_description_length: 1000,
            tasks_per_page: 20,
            default_status: TaskStatus::Todo,
            valid_statuses: TaskStatus::ALL.to_vec(),
            valid_priorities: Priority::ALL.to_vec(),
            backup_enabled: true,
            backup_count: 5,
            colors,
        }
    }
}

impl Config {
    /// Parses a user-supplied status, accepting only the configured set.
    pub fn parse_status(&self, raw: &str) -> Result<TaskStatus, AppError> {
        let allowed = &self.valid_statuses;
        match raw.parse::<TaskStatus>() {
            Ok(status) if allowed.contains(&status) => Ok(status),
            _ => Err(AppError::invalid_input(format!(
                "Invalid status '{}'. Valid statuses are: {}",
                raw.trim(),
                join_labels(allowed.iter().map(|status| status.label()))
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

pub fn config_path() -> PathBuf {
    match std::env::var(CONFIG_ENV_VAR) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(CONFIG_FILE_NAME),
    }
}

/// Loads the config file (if any) and then layers environment overrides on
/// top. A broken config file yields defaults plus the error that caused it.
pub fn load_config_with_fallback() -> ConfigLoad {
    let mut loaded = load_config_with_fallback_from_path(&config_path());
    loaded.config = apply_env_overrides(loaded.config, |key| std::env::var(key).ok());
    loaded
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path).map_err(|err| AppError::io_at(path, &err))?;
    let config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    Ok(normalize_config(config))
}

fn normalize_config(mut config: Config) -> Config {
    let defaults = Config::default();
    if parse_timestamp_format(&config.date_format).is_err() {
        config.date_format = defaults.date_format;
    }
    if parse_timestamp_format(&config.display_date_format).is_err() {
        config.display_date_format = defaults.display_date_format;
    }
    if config.valid_statuses.is_empty() {
        config.valid_statuses = defaults.valid_statuses;
    }
    if config.valid_priorities.is_empty() {
        config.valid_priorities = defaults.valid_priorities;
    }
    if config.tasks_per_page == 0 {
        config.tasks_per_page = defaults.tasks_per_page;
    }
    config
}

/// Applies the supported environment overrides. Blank or unparsable values
/// leave the previous setting in place.
pub fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    let value_of = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(path) = value_of(DATA_FILE_ENV_VAR) {
        config.data_file = PathBuf::from(path);
    }

    if let Some(pattern) = value_of(DATE_FORMAT_ENV_VAR)
        && parse_timestamp_format(&pattern).is_ok()
    {
        config.date_format = pattern;
    }

    if let Some(Ok(limit)) = value_of(MAX_DESC_LENGTH_ENV_VAR).map(|raw| raw.trim().parse::<usize>()) {
        config.max_description_length = limit;
    }

    if let Some(Ok(per_page)) =
        value_of(TASKS_PER_PAGE_ENV_VAR).map(|raw| raw.trim().parse::<usize>())
        && per_page > 0
    {
        config.tasks_per_page = per_page;
    }

    config
}

/// ANSI sequence for a configured colour name; unknown names render plain.
pub fn color_code(name: &str) -> &'static str {
    match name.trim().to_ascii_lowercase().as_str() {
        "red" => "\x1b[31m",
        "green" => "\x1b[32m",
        "yellow" => "\x1b[33m",
        "blue" => "\x1b[34m",
        "magenta" => "\x1b[35m",
        "cyan" => "\x1b[36m",
        "white" => "\x1b[37m",
        _ => "",
    }
}

pub const COLOR_RESET: &str = "\x1b[0m";

pub fn colorize(text: &str, color_name: Option<&str>) -> String {
    let code = color_name.map(color_code).unwrap_or("");
    if code.is_empty() {
        text.to_string()
    } else {
        format!("{code}{text}{COLOR_RESET}")
    }
}
