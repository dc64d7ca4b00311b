//! Sample metadata handling.

use crate::data::count_matrix::ensure_unique;
use crate::error::{RnaError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Name of the metadata column holding each sample's treatment label.
pub const CONDITION_COLUMN: &str = "condition";

/// Sample metadata: one row per sample, string-valued columns.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// Sample IDs in order.
    sample_ids: Vec<String>,
    /// Column names (excluding the sample ID column).
    column_names: Vec<String>,
    /// Data stored as sample_id -> column_name -> value. `None` is missing.
    data: HashMap<String, HashMap<String, Option<String>>>,
}

impl Metadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build metadata from in-memory rows of `(sample_id, values)`.
    pub fn from_rows(column_names: Vec<String>, rows: Vec<(String, Vec<String>)>) -> Result<Self> {
        if rows.is_empty() {
            return Err(RnaError::EmptyData("No samples in metadata".to_string()));
        }
        let sample_ids: Vec<String> = rows.iter().map(|(sid, _)| sid.clone()).collect();
        ensure_unique("sample", &sample_ids)?;

        let mut data = HashMap::with_capacity(rows.len());
        for (sample_id, values) in rows {
            let sample_data: HashMap<String, Option<String>> = column_names
                .iter()
                .enumerate()
                .map(|(idx, col)| (col.clone(), values.get(idx).and_then(|v| parse_cell(v))))
                .collect();
            data.insert(sample_id, sample_data);
        }

        Ok(Self {
            sample_ids,
            column_names,
            data,
        })
    }

    /// Load metadata from a CSV file.
    ///
    /// Expected format:
    /// - First row: header; the first cell labels the sample index, the rest
    ///   are column names
    /// - Subsequent rows: sample ID followed by values
    ///
    /// Empty cells and `NA` are stored as missing.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let header = reader.headers()?.clone();
        if header.len() < 2 {
            return Err(RnaError::EmptyData(
                "Metadata must have at least one variable column".to_string(),
            ));
        }
        let column_names: Vec<String> = header.iter().skip(1).map(String::from).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let sample_id = record.get(0).unwrap_or_default().to_string();
            let values = record.iter().skip(1).map(String::from).collect();
            rows.push((sample_id, values));
        }

        Self::from_rows(column_names, rows)
    }

    /// Sample IDs in order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column names.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Get a value for a specific sample and column. `None` if the sample or
    /// column is unknown or the value is missing.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&str> {
        self.data
            .get(sample_id)
            .and_then(|m| m.get(column))
            .and_then(|v| v.as_deref())
    }

    /// Get all values for a column in sample order.
    pub fn column(&self, column: &str) -> Result<Vec<Option<&str>>> {
        if !self.has_column(column) {
            return Err(RnaError::MissingColumn(column.to_string()));
        }
        Ok(self
            .sample_ids
            .iter()
            .map(|sid| self.get(sid, column))
            .collect())
    }

    /// Values of a column that must be present for every sample.
    pub fn required_column(&self, column: &str) -> Result<Vec<String>> {
        self.column(column)?
            .into_iter()
            .zip(&self.sample_ids)
            .map(|(value, sample)| {
                value.map(String::from).ok_or_else(|| RnaError::MissingValue {
                    column: column.to_string(),
                    sample: sample.clone(),
                })
            })
            .collect()
    }

    /// Re-order metadata to match the sample order of a count matrix.
    ///
    /// The two sample sets must be identical; order may differ.
    pub fn align_to(&self, sample_ids: &[String]) -> Result<Self> {
        let missing: Vec<&str> = sample_ids
            .iter()
            .filter(|sid| !self.has_sample(sid))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(RnaError::SampleMismatch(format!(
                "samples {:?} have counts but no metadata row",
                missing
            )));
        }
        if self.n_samples() != sample_ids.len() {
            let extra: Vec<&str> = self
                .sample_ids
                .iter()
                .filter(|sid| !sample_ids.contains(sid))
                .map(String::as_str)
                .collect();
            return Err(RnaError::SampleMismatch(format!(
                "samples {:?} have metadata but no counts",
                extra
            )));
        }

        let data = sample_ids
            .iter()
            .filter_map(|sid| self.data.get(sid).map(|row| (sid.clone(), row.clone())))
            .collect();

        Ok(Self {
            sample_ids: sample_ids.to_vec(),
            column_names: self.column_names.clone(),
            data,
        })
    }

    /// Check if a sample exists.
    pub fn has_sample(&self, sample_id: &str) -> bool {
        self.data.contains_key(sample_id)
    }

    /// Check if a column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }
}

fn parse_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "NA" || trimmed == "na" {
        None
    } else {
        Some(trimmed.to_string())
    }
}
