//! Reference dataset used as the LIME sampling neighbourhood.
//!
//! A CSV file with one header row and fifteen binary columns in training
//! order. Header names are informational; a mismatch with the known column
//! names is logged but not fatal, since only the column order matters to the
//! classifier.

use log::{info, warn};
use std::path::Path;

use crate::error::LoadError;
use crate::feature::FeatureVector;
use crate::indicator::{Indicator, FEATURE_COUNT};

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDataset {
    header: Vec<String>,
    rows: Vec<FeatureVector>,
}

impl ReferenceDataset {
    /// In-memory dataset; the header defaults to the indicator keys.
    pub fn from_rows(rows: Vec<FeatureVector>) -> Self {
        let header = Indicator::ALL
            .iter()
            .map(|i| i.key().to_string())
            .collect();
        Self { header, rows }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::from_reader(file, path)?;
        info!(
            "loaded reference dataset from {}: {} rows",
            path.display(),
            dataset.len()
        );
        Ok(dataset)
    }

    /// Parse CSV from any reader; `path` is only used in error messages.
    pub fn from_reader<R: std::io::Read>(reader: R, path: &Path) -> Result<Self, LoadError> {
        let csv_err = |source: csv::Error| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let header: Vec<String> = rdr
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        if header.len() != FEATURE_COUNT {
            return Err(LoadError::InvalidDataset {
                path: path.to_path_buf(),
                row: 0,
                reason: format!("header has {} columns, expected {FEATURE_COUNT}", header.len()),
            });
        }
        check_header(&header, path);

        let mut rows = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record.map_err(csv_err)?;
            let cells: Vec<&str> = record.iter().collect();
            let row = FeatureVector::from_cells(&cells).map_err(|e| LoadError::InvalidDataset {
                path: path.to_path_buf(),
                row: i + 1,
                reason: e.to_string(),
            })?;
            rows.push(row);
        }
        if rows.is_empty() {
            return Err(LoadError::EmptyDataset(path.to_path_buf()));
        }
        Ok(Self { header, rows })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column as model inputs.
    pub fn column(&self, indicator: Indicator) -> Vec<f64> {
        self.rows
            .iter()
            .map(|r| f64::from(r.get(indicator)))
            .collect()
    }

    /// Share of rows answering 1 for `indicator`.
    pub fn prevalence(&self, indicator: Indicator) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let ones = self.rows.iter().filter(|r| r.get(indicator) == 1).count();
        ones as f64 / self.rows.len() as f64
    }
}

fn check_header(header: &[String], path: &Path) {
    for (i, (name, expected)) in header.iter().zip(Indicator::ALL).enumerate() {
        match Indicator::from_column_name(name) {
            Some(found) if found == expected => {}
            Some(found) => warn!(
                "{}: column {i} is named '{name}' ({found}) but holds {expected}",
                path.display()
            ),
            None => warn!(
                "{}: column {i} '{name}' is not a known indicator name; assuming {expected}",
                path.display()
            ),
        }
    }
}

/// Load the reference dataset at `path`.
pub fn load_reference(path: impl AsRef<Path>) -> Result<ReferenceDataset, LoadError> {
    ReferenceDataset::load(path)
}
