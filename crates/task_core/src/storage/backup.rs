use crate::error::AppError;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const BACKUP_DIR_NAME: &str = "backups";
const BACKUP_STAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]_[hour][minute][second]");

/// Timestamped copies of a data file, kept in a `backups/` directory next to
/// it and pruned to the newest `retain` files.
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
    prefix: String,
    retain: usize,
}

impl BackupManager {
    pub fn for_data_file(data_file: &Path, retain: usize) -> Self {
        let parent = data_file.parent().unwrap_or_else(|| Path::new(""));
        let stem = data_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tasks".to_string());

        Self {
            dir: parent.join(BACKUP_DIR_NAME),
            prefix: format!("{stem}_backup_"),
            retain,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copies `source` and prunes old copies. Failures are logged and
    /// swallowed: a missing backup must never block the save it precedes.
    pub fn backup_before_save(&self, source: &Path, moment: OffsetDateTime) -> Option<PathBuf> {
        let created = match self.create_backup(source, moment) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(error = %err, "could not create backup");
                return None;
            }
        };

        if let Err(err) = self.prune() {
            tracing::warn!(error = %err, "could not prune old backups");
        }

        Some(created)
    }

    pub fn create_backup(&self, source: &Path, moment: OffsetDateTime) -> Result<PathBuf, AppError> {
        fs::create_dir_all(&self.dir).map_err(|err| AppError::io_at(&self.dir, &err))?;

        let stamp = moment
            .format(BACKUP_STAMP_FORMAT)
            .map_err(|err| AppError::invalid_data(err.to_string()))?;
        let target = self.dir.join(format!("{}{}.json", self.prefix, stamp));
        fs::copy(source, &target).map_err(|err| AppError::io_at(source, &err))?;

        tracing::debug!(backup = %target.display(), "created backup");
        Ok(target)
    }

    /// Backups of this data file, newest first.
    pub fn list(&self) -> Result<Vec<PathBuf>, AppError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir).map_err(|err| AppError::io_at(&self.dir, &err))?;
        let mut backups: Vec<(SystemTime, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| AppError::io_at(&self.dir, &err))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(&self.prefix) || !name.ends_with(".json") {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            backups.push((modified, entry.path()));
        }

        // Names embed the stamp, so they settle ties between equal mtimes.
        backups.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        Ok(backups.into_iter().map(|(_, path)| path).collect())
    }

    pub fn prune(&self) -> Result<Vec<PathBuf>, AppError> {
        let stale: Vec<PathBuf> = self.list()?.into_iter().skip(self.retain).collect();
        for path in &stale {
            fs::remove_file(path).map_err(|err| AppError::io_at(path, &err))?;
            tracing::debug!(backup = %path.display(), "pruned backup");
        }
        Ok(stale)
    }
}
