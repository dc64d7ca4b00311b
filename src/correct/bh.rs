//! Benjamini-Hochberg false discovery rate correction.

use serde::{Deserialize, Serialize};

/// Result of BH correction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BhCorrected {
    /// Input p-values, in input order.
    pub p_values: Vec<f64>,
    /// Adjusted p-values, in input order. NaN where the input was NaN.
    pub padj: Vec<f64>,
    /// Number of p-values that took part in the correction (non-NaN).
    pub n_tests: usize,
}

/// Apply Benjamini-Hochberg FDR correction.
///
/// With the m non-NaN p-values sorted ascending, the adjusted value at rank i
/// is `min_{j >= i}(p_(j) * m / j)`, clipped to 1. This is the same step-up
/// procedure as `fdr_bh` in the usual statistics packages.
///
/// NaN p-values (genes whose test was undefined) are excluded: they do not
/// count towards m and their adjusted value is NaN.
pub fn correct_bh(p_values: &[f64]) -> BhCorrected {
    let mut padj = vec![f64::NAN; p_values.len()];

    let mut indices: Vec<usize> = (0..p_values.len())
        .filter(|&i| !p_values[i].is_nan())
        .collect();
    let n = indices.len();
    if n == 0 {
        return BhCorrected {
            p_values: p_values.to_vec(),
            padj,
            n_tests: 0,
        };
    }

    // Stable sort keeps tied p-values in input order
    indices.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

    let n_f64 = n as f64;
    let mut running_min = f64::INFINITY;

    // Work backwards from the largest p-value
    for (i, &orig_idx) in indices.iter().enumerate().rev() {
        let rank = (i + 1) as f64;
        let adjusted = p_values[orig_idx] * n_f64 / rank;
        running_min = running_min.min(adjusted);
        padj[orig_idx] = running_min.min(1.0);
    }

    BhCorrected {
        p_values: p_values.to_vec(),
        padj,
        n_tests: n,
    }
}
