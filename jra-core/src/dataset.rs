//! One table of rows for a single (category, year) cell.

use std::path::Path;

use crate::category::CategoryKind;
use crate::error::CollectError;

/// Rows collected for one (category, year). Columns are fixed by the category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearlyDataset {
    category: CategoryKind,
    year: i32,
    rows: Vec<Vec<String>>,
}

impl YearlyDataset {
    /// A table with the category's schema and no rows.
    pub fn empty(category: CategoryKind, year: i32) -> Self {
        Self {
            category,
            year,
            rows: Vec::new(),
        }
    }

    /// Build a table from rows, rejecting any row whose width differs from the schema.
    pub fn with_rows(
        category: CategoryKind,
        year: i32,
        rows: Vec<Vec<String>>,
    ) -> Result<Self, CollectError> {
        let width = category.columns().len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(CollectError::Validation(format!(
                "{category} row {i} has {} fields, schema has {width}",
                row.len()
            )));
        }
        Ok(Self {
            category,
            year,
            rows,
        })
    }

    pub fn category(&self) -> CategoryKind {
        self.category
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.category.columns()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `{prefix}_{year}.csv`
    pub fn file_name(&self) -> String {
        format!("{}_{}.csv", self.category.prefix(), self.year)
    }

    /// Encode as CSV: header row, then one line per record.
    pub fn to_csv(&self) -> Result<String, CollectError> {
        let csv_err = |e: csv::Error| CollectError::persistence(self.file_name(), e);

        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(self.columns()).map_err(csv_err)?;
        for row in &self.rows {
            wtr.write_record(row).map_err(csv_err)?;
        }

        let data = wtr
            .into_inner()
            .map_err(|e| CollectError::persistence(self.file_name(), e))?;
        String::from_utf8(data).map_err(|e| CollectError::persistence(self.file_name(), e))
    }

    /// Load a persisted cell back. The header must match the category schema.
    pub fn read_csv(path: &Path, category: CategoryKind, year: i32) -> Result<Self, CollectError> {
        let read_err = |e: csv::Error| CollectError::persistence(path, e);

        let mut rdr = csv::Reader::from_path(path).map_err(read_err)?;
        let header: Vec<String> = rdr
            .headers()
            .map_err(read_err)?
            .iter()
            .map(str::to_string)
            .collect();
        if header != category.columns() {
            return Err(CollectError::persistence(
                path,
                format!("header does not match the {category} schema"),
            ));
        }

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(read_err)?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Self::with_rows(category, year, rows)
    }
}
