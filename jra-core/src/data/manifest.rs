//! Summary manifest: which years are on disk for each category.
//!
//! The manifest is derived only from the `.csv` file names in the output
//! directory, never from in-memory run state. Rebuilding it after a partial
//! run, a restart, or manual file edits always gives the current truth.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::CollectError;

pub const SUMMARY_FILE_NAME: &str = "data_summary.json";

/// `{category_prefix: [year, ...]}`, years sorted and de-duplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummaryManifest {
    entries: BTreeMap<String, Vec<String>>,
}

impl SummaryManifest {
    /// Group file names into the manifest.
    ///
    /// Only names ending in `.csv` count. Everything before the last `_` is the
    /// category key and everything after it (minus `.csv`) is the year. Names
    /// without an underscore are skipped.
    pub fn from_file_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for name in names {
            if let Some((key, year)) = split_cell_name(name.as_ref()) {
                entries
                    .entry(key.to_string())
                    .or_default()
                    .push(year.to_string());
            }
        }
        for years in entries.values_mut() {
            years.sort();
            years.dedup();
        }
        Self { entries }
    }

    /// Scan a directory's file names.
    pub fn scan(dir: &Path) -> Result<Self, CollectError> {
        let read_err = |e: std::io::Error| {
            CollectError::Manifest(format!("failed to list {}: {e}", dir.display()))
        };

        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(read_err)? {
            let entry = entry.map_err(read_err)?;
            if !entry.file_type().map_err(read_err)?.is_file() {
                continue;
            }
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(Self::from_file_names(names))
    }

    /// Write as indented JSON, replacing any existing file.
    pub fn write(&self, path: &Path) -> Result<(), CollectError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CollectError::Manifest(format!("serialization: {e}")))?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|e| {
            CollectError::Manifest(format!("failed to write {}: {e}", tmp_path.display()))
        })?;
        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            CollectError::Manifest(format!("failed to write {}: {e}", path.display()))
        })
    }

    /// Read a manifest written by [`SummaryManifest::write`].
    pub fn load(path: &Path) -> Result<Self, CollectError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CollectError::Manifest(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| CollectError::Manifest(format!("failed to parse {}: {e}", path.display())))
    }

    /// Years present for a category key, if any.
    pub fn years(&self, category: &str) -> Option<&[String]> {
        self.entries.get(category).map(Vec::as_slice)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of (category, year) cells listed.
    pub fn cell_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// `race_results_2020.csv` → `("race_results", "2020")`.
fn split_cell_name(name: &str) -> Option<(&str, &str)> {
    let stem = name.strip_suffix(".csv")?;
    stem.rsplit_once('_')
}
