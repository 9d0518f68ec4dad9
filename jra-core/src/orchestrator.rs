//! Collection orchestrator: years × categories → per-cell CSV files → manifest.
//!
//! For each year in the configured range and each requested category (in
//! declaration order) the matching collector runs once, and its table is
//! persisted unless persistence is switched off. With `workers > 1` years are
//! spread over a bounded rayon pool; all workers share the fetcher's throttle.
//!
//! The summary manifest is rebuilt from the output directory only after every
//! write has finished.

use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::category::CategoryKind;
use crate::config::{CollectionConfig, FailurePolicy};
use crate::data::collector::CollectorSet;
use crate::data::manifest::SummaryManifest;
use crate::data::provider::CollectProgress;
use crate::data::store::CsvStore;
use crate::dataset::YearlyDataset;
use crate::error::CollectError;

/// Collected tables, keyed by category then year.
pub type CollectedData = BTreeMap<CategoryKind, BTreeMap<i32, YearlyDataset>>;

/// A cell that failed and was skipped under [`FailurePolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCell {
    pub category: CategoryKind,
    pub year: i32,
    pub error: String,
}

/// Outcome of a full `collect_all` run.
#[derive(Debug)]
pub struct CollectionReport {
    pub data: CollectedData,
    pub skipped: Vec<SkippedCell>,
    pub total: usize,
}

impl CollectionReport {
    pub fn succeeded(&self) -> usize {
        self.data.values().map(BTreeMap::len).sum()
    }

    pub fn failed(&self) -> usize {
        self.skipped.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Everything one worker produced for one year.
struct YearOutcome {
    datasets: Vec<YearlyDataset>,
    skipped: Vec<SkippedCell>,
}

/// Drives per-year, per-category collection.
pub struct CollectionOrchestrator {
    config: CollectionConfig,
    collectors: CollectorSet,
    store: CsvStore,
}

impl CollectionOrchestrator {
    /// Validate the config and build the orchestrator. Performs no I/O.
    pub fn new(config: CollectionConfig, collectors: CollectorSet) -> Result<Self, CollectError> {
        config.validate()?;
        let store = CsvStore::new(&config.output_dir);
        tracing::info!(
            "Initialized JRA data collector for years {} to {}",
            config.start_year,
            config.end_year
        );
        Ok(Self {
            config,
            collectors,
            store,
        })
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    pub fn store(&self) -> &CsvStore {
        &self.store
    }

    /// Collect the configured categories, then rebuild the manifest at its default path.
    ///
    /// The manifest is not touched if collection fails or is interrupted.
    pub fn run(
        &self,
        progress: &dyn CollectProgress,
        cancel: Option<&AtomicBool>,
    ) -> Result<(CollectionReport, SummaryManifest), CollectError> {
        let report = self.collect_all(&self.config.categories, progress, cancel)?;
        let manifest = self.export_summary(None)?;
        Ok((report, manifest))
    }

    /// Collect one cell, persisting it when `save` is set.
    pub fn collect_one(
        &self,
        category: CategoryKind,
        year: i32,
        save: bool,
    ) -> Result<YearlyDataset, CollectError> {
        let dataset = self.collectors.get(category).collect(year)?;
        if save {
            self.store.write(&dataset)?;
        }
        Ok(dataset)
    }

    /// Collect every year in range for each of `categories`.
    ///
    /// The returned map has one entry per requested category. Under
    /// [`FailurePolicy::Abort`] the first error ends the run; under
    /// [`FailurePolicy::Skip`] transport errors are recorded in
    /// [`CollectionReport::skipped`], any file an earlier run left for that
    /// cell is deleted, and the run continues. Persistence errors are always
    /// fatal.
    pub fn collect_all(
        &self,
        categories: &BTreeSet<CategoryKind>,
        progress: &dyn CollectProgress,
        cancel: Option<&AtomicBool>,
    ) -> Result<CollectionReport, CollectError> {
        let ordered: Vec<CategoryKind> = categories.iter().copied().collect();
        let years: Vec<i32> = self.config.years().collect();
        let total = years.len() * ordered.len();

        if self.config.persist {
            self.store.ensure_dir()?;
        }

        progress.on_start(self.config.start_year, self.config.end_year, total);

        let outcomes: Vec<YearOutcome> = if self.config.workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.workers)
                .build()
                .map_err(|e| CollectError::Runtime(format!("failed to build worker pool: {e}")))?;
            pool.install(|| {
                years
                    .par_iter()
                    .map(|&year| self.collect_year(year, &ordered, progress, cancel))
                    .collect::<Result<Vec<_>, _>>()
            })?
        } else {
            years
                .iter()
                .map(|&year| self.collect_year(year, &ordered, progress, cancel))
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut data: CollectedData = ordered.iter().map(|&c| (c, BTreeMap::new())).collect();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            for ds in outcome.datasets {
                data.entry(ds.category()).or_default().insert(ds.year(), ds);
            }
            skipped.extend(outcome.skipped);
        }
        skipped.sort_by_key(|s| (s.year, s.category));

        let report = CollectionReport {
            data,
            skipped,
            total,
        };
        progress.on_batch_complete(report.succeeded(), report.failed(), total);
        Ok(report)
    }

    fn collect_year(
        &self,
        year: i32,
        categories: &[CategoryKind],
        progress: &dyn CollectProgress,
        cancel: Option<&AtomicBool>,
    ) -> Result<YearOutcome, CollectError> {
        let mut outcome = YearOutcome {
            datasets: Vec::with_capacity(categories.len()),
            skipped: Vec::new(),
        };

        for &category in categories {
            if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
                return Err(CollectError::Interrupted);
            }

            match self.collect_one(category, year, self.config.persist) {
                Ok(ds) => {
                    progress.on_cell(category, year, Ok(ds.len()));
                    outcome.datasets.push(ds);
                }
                Err(e) if e.is_transport() && self.config.failure_policy == FailurePolicy::Skip => {
                    // A file left by an earlier run must not put this cell in the manifest.
                    self.store.remove(category, year)?;
                    let error = e.to_string();
                    progress.on_cell(category, year, Err(&error));
                    outcome.skipped.push(SkippedCell {
                        category,
                        year,
                        error,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(outcome)
    }

    /// Rebuild the manifest from the output directory and write it.
    ///
    /// Defaults to `{output_dir}/data_summary.json`. Always a full rescan.
    pub fn export_summary(&self, output_path: Option<&Path>) -> Result<SummaryManifest, CollectError> {
        self.store.ensure_dir()?;
        let manifest = SummaryManifest::scan(self.store.dir())?;

        let default_path = self.config.default_summary_path();
        let path = output_path.unwrap_or(&default_path);
        manifest.write(path)?;

        tracing::info!(
            "Exported data summary to {} ({} categories, {} files)",
            path.display(),
            manifest.len(),
            manifest.cell_count()
        );
        Ok(manifest)
    }
}
