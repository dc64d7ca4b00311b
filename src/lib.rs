//! RNAlytics: RNA-seq differential expression
//!
//! Loads per-treatment count matrices, normalizes them, tests every gene
//! against a control group and publishes the results over a small HTTP API.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (CountMatrix, Metadata, AnnotatedDataset, DeResultTable)
//! - **normalize**: Total-count normalization and `ln(1 + x)`
//! - **filter**: Removal of genes expressed in too few samples
//! - **test**: Two-sample Student's t-test
//! - **correct**: Multiple testing correction (Benjamini-Hochberg)
//! - **plot**: Volcano plots
//! - **pipeline**: Per-treatment analysis and run reports
//! - **service**: Read-only HTTP API over the results
//!
//! # Example
//!
//! ```no_run
//! use rnalytics::prelude::*;
//!
//! let report = Analyzer::new(PipelineConfig::default())
//!     .raw_dir("data/raw")
//!     .processed_dir("data/processed")
//!     .run()
//!     .unwrap();
//! println!("{}", report);
//! ```

pub mod correct;
pub mod data;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod pipeline;
pub mod plot;
pub mod service;
pub mod test;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::correct::{correct_bh, BhCorrected};
    pub use crate::data::{
        AnnotatedDataset, CountMatrix, DatasetStage, DeResult, DeResultTable, Metadata,
        ResultSummary,
    };
    pub use crate::error::{Result, RnaError};
    pub use crate::filter::{filter_genes, FilterResult};
    pub use crate::normalize::{log1p, normalize_total, scale, NormalizationReport};
    pub use crate::pipeline::{
        differential_expression, load_treatment, preprocess, Analyzer, PipelineConfig, RunReport,
        Stage, TreatmentOutcome,
    };
    pub use crate::plot::{plot_volcano, VolcanoOptions};
    pub use crate::service::{create_router, AppState, ServiceConfig};
    pub use crate::test::{ttest_ind, TTestResult};
}
