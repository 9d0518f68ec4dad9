//! Per-cell CSV persistence.
//!
//! Layout: `{output_dir}/{prefix}_{year}.csv`
//!
//! Writes go to `{file}.tmp` and are renamed into place, so an interrupted
//! run leaves either the previous file or the new one, never half of one.
//! Re-collecting a cell always overwrites it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::category::CategoryKind;
use crate::dataset::YearlyDataset;
use crate::error::CollectError;

/// The on-disk CSV store.
#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the output directory if it does not exist.
    pub fn ensure_dir(&self) -> Result<(), CollectError> {
        fs::create_dir_all(&self.dir).map_err(|e| CollectError::persistence(&self.dir, e))
    }

    /// `{dir}/{prefix}_{year}.csv`
    pub fn path_for(&self, category: CategoryKind, year: i32) -> PathBuf {
        self.dir.join(format!("{}_{year}.csv", category.prefix()))
    }

    /// Write one dataset, replacing any previous file for the same cell.
    pub fn write(&self, dataset: &YearlyDataset) -> Result<PathBuf, CollectError> {
        let path = self.path_for(dataset.category(), dataset.year());
        let tmp_path = path.with_extension("csv.tmp");
        let contents = dataset.to_csv()?;

        fs::write(&tmp_path, contents).map_err(|e| CollectError::persistence(&tmp_path, e))?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            CollectError::persistence(&path, format!("atomic rename failed: {e}"))
        })?;

        tracing::info!("Saved {} to {}", dataset.category().label(), path.display());
        Ok(path)
    }

    /// Load a previously persisted cell.
    pub fn read(&self, category: CategoryKind, year: i32) -> Result<YearlyDataset, CollectError> {
        YearlyDataset::read_csv(&self.path_for(category, year), category, year)
    }

    /// Delete a cell's file. Returns whether one existed.
    pub fn remove(&self, category: CategoryKind, year: i32) -> Result<bool, CollectError> {
        let path = self.path_for(category, year);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Removed stale {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CollectError::persistence(&path, e)),
        }
    }

    pub fn contains(&self, category: CategoryKind, year: i32) -> bool {
        self.path_for(category, year).is_file()
    }
}
