use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::security::{self, ALLOWED_DATASHEET_EXTENSIONS, MAX_FILE_SIZE_MB};

pub const BACKUP_DIR: &str = "backups";

#[derive(Debug, Error)]
pub enum DatasheetError {
    #[error("Invalid datasheet request: {0}")]
    Validation(String),
    #[error("Source file does not exist: {0}")]
    NotFound(PathBuf),
    #[error("Failed to {action} {path}: {source}")]
    Storage {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DatasheetError>;

fn storage_error(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> DatasheetError {
    let path = path.to_path_buf();
    move |source| DatasheetError::Storage {
        action,
        path,
        source,
    }
}

/// Directory name a catalog identifier is filed under.
///
/// Catalog identifiers may contain `.`, `/` and spaces; each maps to `_` so
/// the result is always a single path segment.
pub fn component_dir_name(identifier: &str) -> Result<String> {
    let name: String = identifier
        .trim()
        .chars()
        .map(|c| if matches!(c, '.' | '/' | ' ') { '_' } else { c })
        .collect();
    if !security::validate_identifier(identifier.trim()) || !security::validate_short_identifier(&name) {
        return Err(DatasheetError::Validation(format!(
            "invalid component ID: {:?}",
            identifier
        )));
    }
    Ok(name)
}

/// File-system organizer for component datasheets.
#[derive(Debug, Clone)]
pub struct DatasheetStore {
    base_path: PathBuf,
}

impl DatasheetStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).map_err(storage_error("create directory", &base_path))?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn component_dir(&self, component_id: &str) -> Result<PathBuf> {
        if !security::validate_short_identifier(component_id) {
            return Err(DatasheetError::Validation(format!(
                "invalid component ID: {:?}",
                component_id
            )));
        }
        Ok(self.base_path.join(component_id))
    }

    /// Path a datasheet for `component_id` lives at, creating the component
    /// directory. Only the final component of `filename` is used.
    pub fn resolve_path(&self, component_id: &str, filename: &str) -> Result<PathBuf> {
        let dir = self.component_dir(component_id)?;
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| DatasheetError::Validation(format!("invalid filename: {:?}", filename)))?;

        fs::create_dir_all(&dir).map_err(storage_error("create directory", &dir))?;
        Ok(dir.join(name))
    }

    fn check_source(source: &Path) -> Result<()> {
        if !source.is_file() {
            return Err(DatasheetError::NotFound(source.to_path_buf()));
        }
        if !security::validate_file_extension(source, ALLOWED_DATASHEET_EXTENSIONS) {
            return Err(DatasheetError::Validation(format!(
                "only PDF files are supported: {}",
                source.display()
            )));
        }
        if !security::validate_file_size(source, MAX_FILE_SIZE_MB) {
            return Err(DatasheetError::Validation(format!(
                "file exceeds {}MB: {}",
                MAX_FILE_SIZE_MB,
                source.display()
            )));
        }
        Ok(())
    }

    /// Copy a PDF into the component's directory and return where it landed.
    pub fn store(&self, component_id: &str, source: &Path) -> Result<PathBuf> {
        Self::check_source(source)?;

        let filename = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DatasheetError::Validation(format!("invalid filename: {}", source.display())))?;
        let dest = self.resolve_path(component_id, filename)?;

        self.copy_with_backup(source, &dest)?;
        tracing::info!("Stored datasheet for component {}: {}", component_id, dest.display());
        Ok(dest)
    }

    /// Overwrite an already stored datasheet with another PDF.
    pub fn replace(&self, existing: &Path, source: &Path) -> Result<PathBuf> {
        Self::check_source(source)?;

        let parent = existing
            .parent()
            .ok_or_else(|| DatasheetError::Validation(format!("invalid datasheet path: {}", existing.display())))?;
        if !security::validate_file_path(parent, &self.base_path) {
            return Err(DatasheetError::Validation(format!(
                "datasheet is outside {}: {}",
                self.base_path.display(),
                existing.display()
            )));
        }

        self.copy_with_backup(source, existing)?;
        tracing::info!("Replaced datasheet {}", existing.display());
        Ok(existing.to_path_buf())
    }

    fn copy_with_backup(&self, source: &Path, dest: &Path) -> Result<()> {
        if dest.exists() {
            let same_file = match (source.canonicalize(), dest.canonicalize()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            };
            if same_file {
                return Ok(());
            }
            self.backup(dest)?;
        }

        fs::copy(source, dest).map_err(|e| {
            tracing::error!("Error storing datasheet {}: {}", dest.display(), e);
            DatasheetError::Storage {
                action: "copy datasheet to",
                path: dest.to_path_buf(),
                source: e,
            }
        })?;
        Ok(())
    }

    fn backup(&self, current: &Path) -> Result<PathBuf> {
        let dir = current
            .parent()
            .map(|p| p.join(BACKUP_DIR))
            .ok_or_else(|| DatasheetError::Validation(format!("invalid datasheet path: {}", current.display())))?;
        fs::create_dir_all(&dir).map_err(storage_error("create directory", &dir))?;

        let name = current
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("datasheet.pdf");
        let backup = dir.join(format!("{}_{}", Local::now().format("%Y%m%d_%H%M%S"), name));

        fs::copy(current, &backup).map_err(storage_error("back up datasheet to", &backup))?;
        tracing::info!("Backed up {} to {}", current.display(), backup.display());
        Ok(backup)
    }

    /// Backups kept for a component, oldest first.
    pub fn backups(&self, component_id: &str) -> Result<Vec<PathBuf>> {
        let dir = self.component_dir(component_id)?.join(BACKUP_DIR);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut backups: Vec<PathBuf> = fs::read_dir(&dir)
            .map_err(storage_error("read directory", &dir))?
            .flatten()
            .map(|entry| entry.path())
            .filter(|p| p.is_file())
            .collect();
        backups.sort();
        Ok(backups)
    }

    /// Path to show for a stored datasheet, if it is still on disk.
    pub fn preview_path(&self, datasheet_path: &Path) -> Option<PathBuf> {
        datasheet_path.is_file().then(|| datasheet_path.to_path_buf())
    }
}
