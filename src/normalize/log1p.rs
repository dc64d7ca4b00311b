//! Natural-log transform of normalized values.

use crate::data::{AnnotatedDataset, DatasetStage};
use crate::error::{RnaError, Result};

/// Replace every value `x` with `ln(1 + x)`.
///
/// Must run after total-count normalization. Zeros stay zero, so the
/// expressed/not-expressed pattern used by gene filtering is preserved.
pub fn log1p(dataset: &mut AnnotatedDataset) -> Result<()> {
    dataset.expect_stage(DatasetStage::Normalized, "log1p transform")?;

    if dataset.matrix().iter().any(|&v| v < 0.0 || v.is_nan()) {
        return Err(RnaError::Numerical(
            "log1p requires non-negative values".to_string(),
        ));
    }

    dataset.matrix_mut().apply(|v| *v = v.ln_1p());
    dataset.advance(DatasetStage::LogTransformed);
    Ok(())
}
