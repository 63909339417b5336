use crate::error::AppError;
use crate::model::{
    Priority, StoreMetadata, Task, TaskStatus, normalize_category, parse_due_date,
};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: &str = "2.0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreState {
    pub tasks: Vec<Task>,
    pub next_id: u64,
    pub metadata: StoreMetadata,
}

impl StoreState {
    pub fn empty(stamp: &str) -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 1,
            metadata: fresh_metadata(stamp),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreLoad {
    pub state: StoreState,
    pub error: Option<AppError>,
}

#[derive(Serialize)]
struct StoredTasksRef<'a> {
    tasks: &'a [Task],
    next_id: u64,
    metadata: &'a StoreMetadata,
}

#[derive(Debug, Deserialize)]
struct StoredTasks {
    #[serde(default)]
    tasks: Vec<StoredTask>,
    #[serde(default)]
    next_id: Option<u64>,
    #[serde(default)]
    metadata: Option<StoreMetadata>,
}

/// Task record as found on disk; fields added after the first release are
/// optional here and backfilled by [`StoredTask::migrate`].
#[derive(Debug, Deserialize)]
struct StoredTask {
    id: u64,
    description: String,
    status: TaskStatus,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(rename = "createdAt")]
    created_at: String,
    #[serde(rename = "updatedAt")]
    updated_at: String,
}

impl StoredTask {
    fn needs_migration(&self) -> bool {
        self.category.is_none() || self.priority.is_none()
    }

    fn migrate(self) -> Result<Task, AppError> {
        let due_date = match self.due_date.as_deref() {
            Some(raw) => Some(parse_due_date(raw).map_err(|_| {
                AppError::invalid_data(format!("task {} has malformed due_date '{raw}'", self.id))
            })?),
            None => None,
        };

        Ok(Task {
            id: self.id,
            description: self.description,
            status: self.status,
            category: normalize_category(self.category.as_deref()),
            priority: self.priority.unwrap_or_default(),
            due_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn fresh_metadata(stamp: &str) -> StoreMetadata {
    StoreMetadata {
        version: SCHEMA_VERSION.to_string(),
        created: stamp.to_string(),
        last_modified: stamp.to_string(),
    }
}

/// Reads and migrates the store at `path`. `stamp` seeds metadata for a
/// missing file or a document without a metadata block.
pub fn load_state(path: &Path, stamp: &str) -> Result<StoreState, AppError> {
    if !path.exists() {
        return Ok(StoreState::empty(stamp));
    }

    let content = fs::read_to_string(path).map_err(|err| AppError::io_at(path, &err))?;
    let stored: StoredTasks = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("Error loading tasks file {}: {}", path.display(), err))
    })?;

    let migrated = stored
        .tasks
        .iter()
        .filter(|task| task.needs_migration())
        .count();
    if migrated > 0 {
        tracing::debug!(path = %path.display(), migrated, "backfilled legacy task fields");
    }

    let tasks = stored
        .tasks
        .into_iter()
        .map(StoredTask::migrate)
        .collect::<Result<Vec<_>, _>>()?;

    let id_floor = match tasks.iter().map(|task| task.id).max() {
        Some(max) => max.checked_add(1).ok_or_else(|| {
            AppError::invalid_data(format!("task id {max} leaves no room for another task"))
        })?,
        None => 1,
    };
    let next_id = stored.next_id.unwrap_or(1).max(id_floor);

    Ok(StoreState {
        tasks,
        next_id,
        metadata: stored.metadata.unwrap_or_else(|| fresh_metadata(stamp)),
    })
}

/// Like [`load_state`], but a corrupt or unreadable file yields an empty
/// store together with the error that was swallowed.
pub fn load_state_with_fallback(path: &Path, stamp: &str) -> StoreLoad {
    match load_state(path, stamp) {
        Ok(state) => StoreLoad { state, error: None },
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "starting with an empty task store");
            StoreLoad {
                state: StoreState::empty(stamp),
                error: Some(err),
            }
        }
    }
}

/// Writes the whole store to a sibling temp file and renames it over `path`,
/// so an interrupted or failed save never leaves a half-written document.
pub fn save_state(path: &Path, state: &StoreState) -> Result<(), AppError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|err| AppError::io_at(parent, &err))?;
    }

    let stored = StoredTasksRef {
        tasks: &state.tasks,
        next_id: state.next_id,
        metadata: &state.metadata,
    };
    let mut content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    content.push('\n');

    let temp_path = temp_path_for(path);
    let written = write_synced(&temp_path, content.as_bytes())
        .and_then(|_| fs::rename(&temp_path, path));
    if let Err(err) = written {
        fs::remove_file(&temp_path).ok();
        return Err(AppError::io_at(path, &err));
    }

    tracing::debug!(path = %path.display(), tasks = state.tasks.len(), "saved task store");
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tasks.json".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}
