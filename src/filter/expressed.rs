//! Removal of genes expressed in too few samples.

use crate::data::{AnnotatedDataset, DatasetStage};
use crate::error::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default minimum number of expressing samples.
pub const DEFAULT_MIN_SAMPLES: usize = 5;

/// Filter genes by the number of samples in which they are expressed.
///
/// A gene is kept when it is non-zero in at least `min_samples` samples.
/// The count is taken on the current (normalized, log-transformed) values.
/// Removing every gene is allowed; the caller decides whether an empty
/// dataset is a problem.
///
/// # Arguments
/// * `dataset` - Log-transformed dataset, filtered in place
/// * `min_samples` - Minimum number of samples with a non-zero value
pub fn filter_genes(dataset: &mut AnnotatedDataset, min_samples: usize) -> Result<FilterResult> {
    dataset.expect_stage(DatasetStage::LogTransformed, "Gene filtering")?;

    let n_before = dataset.n_genes();
    let view: &AnnotatedDataset = dataset;
    let keep_indices: Vec<usize> = (0..n_before)
        .into_par_iter()
        .filter(|&gene| expressing_samples(view, gene) >= min_samples)
        .collect();

    dataset.retain_genes(&keep_indices);
    dataset.advance(DatasetStage::Filtered);

    let n_after = keep_indices.len();
    if n_after == 0 && n_before > 0 {
        warn!(
            min_samples,
            n_samples = dataset.n_samples(),
            "no genes expressed in enough samples"
        );
    }

    Ok(FilterResult {
        min_samples,
        n_before,
        n_after,
        n_removed: n_before - n_after,
        retention_rate: if n_before > 0 {
            n_after as f64 / n_before as f64
        } else {
            0.0
        },
    })
}

/// Number of samples with a non-zero value for `gene`.
pub fn expressing_samples(dataset: &AnnotatedDataset, gene: usize) -> usize {
    dataset
        .matrix()
        .row(gene)
        .iter()
        .filter(|&&v| v != 0.0)
        .count()
}

/// Result of gene filtering with statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterResult {
    /// Threshold that was applied.
    pub min_samples: usize,
    /// Number of genes before filtering.
    pub n_before: usize,
    /// Number of genes after filtering.
    pub n_after: usize,
    /// Number of genes removed.
    pub n_removed: usize,
    /// Proportion of genes retained.
    pub retention_rate: f64,
}

impl std::fmt::Display for FilterResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Gene filter (min samples = {})", self.min_samples)?;
        writeln!(f, "  Before:    {} genes", self.n_before)?;
        writeln!(f, "  After:     {} genes", self.n_after)?;
        writeln!(f, "  Removed:   {} genes", self.n_removed)?;
        writeln!(f, "  Retained:  {:.1}%", self.retention_rate * 100.0)?;
        Ok(())
    }
}
