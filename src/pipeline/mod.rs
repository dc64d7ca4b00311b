//! Per-treatment analysis: load, preprocess, test, persist, plot.

mod config;
mod runner;
mod stages;

pub use config::{PipelineConfig, DEFAULT_CONTROL_LABEL, DEFAULT_TREATMENTS};
pub use runner::{
    table_path, volcano_path, Analyzer, RunReport, Stage, TreatmentOutcome, TreatmentReport,
    TreatmentSummary,
};
pub use stages::{
    counts_path, differential_expression, ensure_valid_treatment, load_treatment, metadata_path,
    preprocess, PreprocessReport,
};
