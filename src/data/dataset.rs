//! Annotated expression dataset: values, gene index and sample metadata in
//! one object, mutated in place by the preprocessing steps.

use crate::data::metadata::CONDITION_COLUMN;
use crate::data::{CountMatrix, Metadata};
use crate::error::{RnaError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Processing stage a dataset has reached.
///
/// Stages only move forward; the preprocessing functions check the stage
/// they expect before touching the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatasetStage {
    /// Raw counts straight from disk.
    Loaded,
    /// Total-count normalized.
    Normalized,
    /// `ln(1 + x)` applied.
    LogTransformed,
    /// Lowly expressed genes removed.
    Filtered,
}

/// Expression values (genes × samples) with their annotations.
#[derive(Debug, Clone)]
pub struct AnnotatedDataset {
    data: DMatrix<f64>,
    gene_ids: Vec<String>,
    sample_ids: Vec<String>,
    metadata: Metadata,
    conditions: Vec<String>,
    stage: DatasetStage,
}

impl AnnotatedDataset {
    /// Pair a count matrix with its metadata.
    ///
    /// Metadata is re-ordered to the matrix's sample order. Every sample must
    /// carry a `condition` value.
    pub fn new(counts: &CountMatrix, metadata: &Metadata) -> Result<Self> {
        let metadata = metadata.align_to(counts.sample_ids())?;
        let conditions = metadata.required_column(CONDITION_COLUMN)?;

        Ok(Self {
            data: counts.to_dense(),
            gene_ids: counts.gene_ids().to_vec(),
            sample_ids: counts.sample_ids().to_vec(),
            metadata,
            conditions,
            stage: DatasetStage::Loaded,
        })
    }

    /// Number of genes.
    pub fn n_genes(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Condition label of every sample, in sample order.
    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    /// Current processing stage.
    pub fn stage(&self) -> DatasetStage {
        self.stage
    }

    /// Value for a gene and sample.
    pub fn get(&self, gene: usize, sample: usize) -> f64 {
        self.data[(gene, sample)]
    }

    /// Values of one gene across samples.
    pub fn gene_values(&self, gene: usize) -> Vec<f64> {
        self.data.row(gene).iter().copied().collect()
    }

    /// Indices of samples whose condition equals `label`.
    pub fn samples_with_condition(&self, label: &str) -> Vec<usize> {
        self.conditions
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_str() == label)
            .map(|(i, _)| i)
            .collect()
    }

    /// Underlying matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub(crate) fn matrix_mut(&mut self) -> &mut DMatrix<f64> {
        &mut self.data
    }

    /// Fail unless the dataset is at `expected`.
    pub(crate) fn expect_stage(&self, expected: DatasetStage, step: &str) -> Result<()> {
        if self.stage != expected {
            return Err(RnaError::Pipeline(format!(
                "{} requires a {:?} dataset, found {:?}",
                step, expected, self.stage
            )));
        }
        Ok(())
    }

    pub(crate) fn advance(&mut self, stage: DatasetStage) {
        debug_assert!(stage > self.stage);
        self.stage = stage;
    }

    /// Keep only the genes at `keep` (ascending indices).
    pub(crate) fn retain_genes(&mut self, keep: &[usize]) {
        let n_samples = self.n_samples();
        let data = DMatrix::from_fn(keep.len(), n_samples, |r, c| self.data[(keep[r], c)]);
        self.gene_ids = keep.iter().map(|&i| self.gene_ids[i].clone()).collect();
        self.data = data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_dataset() -> AnnotatedDataset {
        let counts = CountMatrix::from_rows(
            &[vec![1.0, 2.0, 3.0], vec![0.0, 5.0, 6.0]],
            vec!["G1".into(), "G2".into()],
            vec!["S1".into(), "S2".into(), "S3".into()],
        )
        .unwrap();
        let metadata = Metadata::from_rows(
            vec!["condition".into()],
            vec![
                ("S3".into(), vec!["VOC".into()]),
                ("S1".into(), vec!["control".into()]),
                ("S2".into(), vec!["VOC".into()]),
            ],
        )
        .unwrap();
        AnnotatedDataset::new(&counts, &metadata).unwrap()
    }

    #[test]
    fn test_conditions_follow_count_order() {
        let ds = create_dataset();
        assert_eq!(ds.conditions(), &["control", "VOC", "VOC"]);
        assert_eq!(ds.samples_with_condition("VOC"), vec![1, 2]);
        assert_eq!(ds.stage(), DatasetStage::Loaded);
    }

    #[test]
    fn test_retain_genes() {
        let mut ds = create_dataset();
        ds.retain_genes(&[1]);
        assert_eq!(ds.n_genes(), 1);
        assert_eq!(ds.gene_ids(), &["G2"]);
        assert_eq!(ds.gene_values(0), vec![0.0, 5.0, 6.0]);
    }

    #[test]
    fn test_missing_condition_column() {
        let counts = CountMatrix::from_rows(&[vec![1.0]], vec!["G1".into()], vec!["S1".into()]).unwrap();
        let metadata = Metadata::from_rows(vec!["batch".into()], vec![("S1".into(), vec!["A".into()])]).unwrap();
        assert!(matches!(
            AnnotatedDataset::new(&counts, &metadata),
            Err(RnaError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_missing_condition_value() {
        let counts = CountMatrix::from_rows(&[vec![1.0]], vec!["G1".into()], vec!["S1".into()]).unwrap();
        let metadata =
            Metadata::from_rows(vec!["condition".into()], vec![("S1".into(), vec!["NA".into()])]).unwrap();
        assert!(matches!(
            AnnotatedDataset::new(&counts, &metadata),
            Err(RnaError::MissingValue { .. })
        ));
    }
}
