//! Gene filtering.

pub mod expressed;

pub use expressed::{expressing_samples, filter_genes, FilterResult, DEFAULT_MIN_SAMPLES};
