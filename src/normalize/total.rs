//! Total-count normalization.
//!
//! Each sample is rescaled so that its values sum to a common target
//! (1e6 gives counts per million). Library-size differences between
//! samples are removed before any comparison is made.

use crate::data::{AnnotatedDataset, DatasetStage};
use crate::error::{RnaError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What total-count normalization did to a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationReport {
    /// Target per-sample total.
    pub target_sum: f64,
    /// Library sizes (column totals) before normalization.
    pub library_sizes: Vec<f64>,
    /// Samples with zero total counts, left all-zero.
    pub zero_library_samples: Vec<String>,
}

/// Normalize every sample of `dataset` to sum to `target_sum`.
///
/// For sample j: x_ij ← x_ij / sum(x_j) * target_sum
///
/// Samples whose total is zero cannot be scaled; they are left as zeros and
/// listed in the report.
///
/// # Example
/// ```ignore
/// let report = normalize_total(&mut dataset, scale::CPM)?;
/// ```
pub fn normalize_total(dataset: &mut AnnotatedDataset, target_sum: f64) -> Result<NormalizationReport> {
    dataset.expect_stage(DatasetStage::Loaded, "Total-count normalization")?;

    if !(target_sum.is_finite() && target_sum > 0.0) {
        return Err(RnaError::InvalidParameter(
            "Target sum must be positive".to_string(),
        ));
    }
    if dataset.n_samples() == 0 {
        return Err(RnaError::EmptyData(
            "Cannot normalize a dataset without samples".to_string(),
        ));
    }

    let library_sizes: Vec<f64> = dataset
        .matrix()
        .column_iter()
        .map(|col| col.sum())
        .collect();

    let zero_library_samples: Vec<String> = library_sizes
        .iter()
        .zip(dataset.sample_ids())
        .filter(|&(&size, _)| size == 0.0)
        .map(|(_, sid)| sid.clone())
        .collect();
    if !zero_library_samples.is_empty() {
        warn!(
            samples = ?zero_library_samples,
            "samples with zero total counts left unnormalized"
        );
    }

    for (mut col, &size) in dataset.matrix_mut().column_iter_mut().zip(&library_sizes) {
        if size > 0.0 {
            col *= target_sum / size;
        }
    }

    dataset.advance(DatasetStage::Normalized);

    Ok(NormalizationReport {
        target_sum,
        library_sizes,
        zero_library_samples,
    })
}

/// Common normalization targets.
pub mod scale {
    /// Counts per million (CPM).
    pub const CPM: f64 = 1_000_000.0;
    /// Counts per 10,000.
    pub const CP10K: f64 = 10_000.0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CountMatrix, Metadata};
    use approx::assert_relative_eq;

    fn create_dataset(rows: &[Vec<f64>]) -> AnnotatedDataset {
        let n_samples = rows[0].len();
        let gene_ids: Vec<String> = (0..rows.len()).map(|i| format!("G{}", i)).collect();
        let sample_ids: Vec<String> = (0..n_samples).map(|j| format!("S{}", j)).collect();
        let counts = CountMatrix::from_rows(rows, gene_ids, sample_ids.clone()).unwrap();
        let metadata = Metadata::from_rows(
            vec!["condition".into()],
            sample_ids
                .into_iter()
                .map(|sid| (sid, vec!["control".to_string()]))
                .collect(),
        )
        .unwrap();
        AnnotatedDataset::new(&counts, &metadata).unwrap()
    }

    #[test]
    fn test_columns_sum_to_target() {
        // Samples with totals 100, 200, 50, 1000 and identical composition
        let mut ds = create_dataset(&[
            vec![50.0, 100.0, 25.0, 500.0],
            vec![30.0, 60.0, 15.0, 300.0],
            vec![20.0, 40.0, 10.0, 200.0],
        ]);
        let report = normalize_total(&mut ds, scale::CPM).unwrap();

        assert_eq!(report.library_sizes, vec![100.0, 200.0, 50.0, 1000.0]);
        for j in 0..ds.n_samples() {
            let col_sum: f64 = (0..ds.n_genes()).map(|i| ds.get(i, j)).sum();
            assert_relative_eq!(col_sum, 1_000_000.0, epsilon = 1e-6);
            assert_relative_eq!(ds.get(0, j), 500_000.0, epsilon = 1e-6);
        }
        assert_eq!(ds.stage(), DatasetStage::Normalized);
    }

    #[test]
    fn test_zero_library_left_as_zero() {
        let mut ds = create_dataset(&[vec![10.0, 0.0], vec![10.0, 0.0]]);
        let report = normalize_total(&mut ds, 100.0).unwrap();

        assert_eq!(report.zero_library_samples, vec!["S1"]);
        assert_eq!(ds.get(0, 1), 0.0);
        assert_relative_eq!(ds.get(0, 0), 50.0);
    }

    #[test]
    fn test_invalid_target_sum() {
        let mut ds = create_dataset(&[vec![1.0, 2.0]]);
        assert!(normalize_total(&mut ds, 0.0).is_err());
        assert!(normalize_total(&mut ds, -1.0).is_err());
        assert!(normalize_total(&mut ds, f64::NAN).is_err());
        assert_eq!(ds.stage(), DatasetStage::Loaded);
    }

    #[test]
    fn test_cannot_normalize_twice() {
        let mut ds = create_dataset(&[vec![1.0, 2.0]]);
        normalize_total(&mut ds, scale::CP10K).unwrap();
        assert!(matches!(
            normalize_total(&mut ds, scale::CP10K),
            Err(RnaError::Pipeline(_))
        ));
    }
}
