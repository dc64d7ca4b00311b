//! The individual steps of a treatment's analysis.

use crate::correct::correct_bh;
use crate::data::{AnnotatedDataset, CountMatrix, DatasetStage, DeResult, DeResultTable, Metadata};
use crate::error::{RnaError, Result};
use crate::filter::{filter_genes, FilterResult};
use crate::normalize::{log1p, normalize_total, NormalizationReport};
use crate::test::{ttest_ind, TTestResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Path of a treatment's raw count matrix.
pub fn counts_path(raw_dir: &Path, treatment: &str) -> PathBuf {
    raw_dir.join(format!("{}_counts.csv", treatment))
}

/// Path of a treatment's sample metadata.
pub fn metadata_path(raw_dir: &Path, treatment: &str) -> PathBuf {
    raw_dir.join(format!("{}_metadata.csv", treatment))
}

/// Check `treatment` against the configured set.
pub fn ensure_valid_treatment(treatment: &str, valid: &[String]) -> Result<()> {
    if valid.iter().any(|t| t == treatment) {
        Ok(())
    } else {
        Err(RnaError::UnknownTreatment {
            treatment: treatment.to_string(),
            valid: valid.to_vec(),
        })
    }
}

/// Load a treatment's counts and metadata into an annotated dataset.
pub fn load_treatment(raw_dir: &Path, treatment: &str, valid: &[String]) -> Result<AnnotatedDataset> {
    ensure_valid_treatment(treatment, valid)?;

    let counts_file = counts_path(raw_dir, treatment);
    let metadata_file = metadata_path(raw_dir, treatment);
    for path in [&counts_file, &metadata_file] {
        if !path.is_file() {
            return Err(RnaError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )));
        }
    }

    let counts = CountMatrix::from_csv(&counts_file)?;
    let metadata = Metadata::from_csv(&metadata_file)?;
    let dataset = AnnotatedDataset::new(&counts, &metadata)?;

    debug!(
        treatment,
        n_genes = dataset.n_genes(),
        n_samples = dataset.n_samples(),
        nnz = counts.nnz(),
        "loaded raw data"
    );
    Ok(dataset)
}

/// What preprocessing did to a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessReport {
    pub normalization: NormalizationReport,
    pub filter: FilterResult,
}

/// Normalize, log-transform and filter, in that order.
pub fn preprocess(dataset: &mut AnnotatedDataset, target_sum: f64, min_samples: usize) -> Result<PreprocessReport> {
    let normalization = normalize_total(dataset, target_sum)?;
    log1p(dataset)?;
    let filter = filter_genes(dataset, min_samples)?;
    Ok(PreprocessReport {
        normalization,
        filter,
    })
}

/// Per-gene t-test of `treatment` samples against `control_label` samples,
/// followed by BH correction across the table.
///
/// The fold change is the difference of the group means of the
/// log-transformed values. Rows whose test is undefined (an empty group, too
/// few samples) are kept with NaN p-values.
pub fn differential_expression(
    dataset: &AnnotatedDataset,
    treatment: &str,
    control_label: &str,
) -> Result<DeResultTable> {
    dataset.expect_stage(DatasetStage::Filtered, "Differential expression")?;

    let treated = dataset.samples_with_condition(treatment);
    let control = dataset.samples_with_condition(control_label);
    if treated.is_empty() || control.is_empty() {
        warn!(
            treatment,
            n_treated = treated.len(),
            n_control = control.len(),
            "a comparison group has no samples; p-values will be undefined"
        );
    }

    let tests: Vec<TTestResult> = (0..dataset.n_genes())
        .into_par_iter()
        .map(|gene| {
            let values = dataset.matrix().row(gene);
            let a: Vec<f64> = treated.iter().map(|&j| values[j]).collect();
            let b: Vec<f64> = control.iter().map(|&j| values[j]).collect();
            ttest_ind(&a, &b)
        })
        .collect();

    let p_values: Vec<f64> = tests.iter().map(|t| t.p_value).collect();
    let corrected = correct_bh(&p_values);
    debug!(
        treatment,
        n_genes = p_values.len(),
        n_tests = corrected.n_tests,
        "adjusted p-values"
    );

    let results = dataset
        .gene_ids()
        .iter()
        .zip(&tests)
        .zip(&corrected.padj)
        .map(|((gene, test), &padj)| DeResult {
            gene: gene.clone(),
            log2_fold_change: test.mean_a - test.mean_b,
            p_value: test.p_value,
            treatment: treatment.to_string(),
            padj,
        })
        .collect();

    Ok(DeResultTable::new(treatment.to_string(), results))
}
