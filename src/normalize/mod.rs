//! Normalization and transformation of expression values.
//!
//! - **total**: total-count scaling to a common per-sample target
//! - **log1p**: natural-log transform of the scaled values

pub mod log1p;
pub mod total;

pub use log1p::log1p;
pub use total::{normalize_total, scale, NormalizationReport};
