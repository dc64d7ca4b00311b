//! Pipeline configuration.

use crate::error::{RnaError, Result};
use crate::filter::DEFAULT_MIN_SAMPLES;
use crate::normalize::scale;
use crate::plot::VolcanoOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Treatments analysed when none are configured.
pub const DEFAULT_TREATMENTS: [&str; 2] = ["CsA", "VOC"];

/// Condition label of the reference group.
pub const DEFAULT_CONTROL_LABEL: &str = "control";

/// Everything an analysis run needs to know.
///
/// Every field has a default, so a YAML file only has to name what it
/// changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding `<T>_counts.csv` and `<T>_metadata.csv`.
    pub raw_dir: PathBuf,
    /// Directory the result tables and plots are written to.
    pub processed_dir: PathBuf,
    /// Treatments to analyse, in order.
    pub treatments: Vec<String>,
    /// Condition value of the control samples.
    pub control_label: String,
    /// Per-sample total after normalization.
    pub target_sum: f64,
    /// Minimum number of expressing samples for a gene to be tested.
    pub min_samples: usize,
    /// Volcano plot settings, including the significance level.
    pub volcano: VolcanoOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
            treatments: DEFAULT_TREATMENTS.iter().map(|t| t.to_string()).collect(),
            control_label: DEFAULT_CONTROL_LABEL.to_string(),
            target_sum: scale::CPM,
            min_samples: DEFAULT_MIN_SAMPLES,
            volcano: VolcanoOptions::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(RnaError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(RnaError::from)
    }

    /// Load and validate a YAML config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.target_sum.is_finite() && self.target_sum > 0.0) {
            return Err(RnaError::InvalidParameter(format!(
                "target_sum must be positive, got {}",
                self.target_sum
            )));
        }
        let alpha = self.volcano.alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(RnaError::InvalidParameter(format!(
                "volcano.alpha must be in (0, 1], got {}",
                alpha
            )));
        }
        if self.volcano.width == 0 || self.volcano.height == 0 {
            return Err(RnaError::InvalidParameter(
                "volcano plot dimensions must be non-zero".to_string(),
            ));
        }
        if self.control_label.is_empty() {
            return Err(RnaError::InvalidParameter(
                "control_label must not be empty".to_string(),
            ));
        }
        if let Some(t) = self.treatments.iter().find(|t| **t == self.control_label) {
            return Err(RnaError::InvalidParameter(format!(
                "treatment '{}' is the control label",
                t
            )));
        }
        Ok(())
    }

    /// Annotated example config, as written by `rnalytics example`.
    pub fn example_yaml() -> Result<String> {
        let body = Self::default().to_yaml()?;
        Ok(format!(
            "# RNAlytics pipeline configuration\n\
             #\n\
             # raw_dir must contain <T>_counts.csv (genes x samples) and\n\
             # <T>_metadata.csv (one row per sample with a 'condition' column)\n\
             # for every treatment T. Results go to processed_dir/deg_<T>.csv and\n\
             # processed_dir/volcano_<T>.png.\n\
             \n{}",
            body
        ))
    }
}
