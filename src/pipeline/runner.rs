//! Runs the full analysis for every configured treatment.

use crate::data::ResultSummary;
use crate::error::{RnaError, Result};
use crate::filter::FilterResult;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::stages::{differential_expression, load_treatment, preprocess};
use crate::plot::plot_volcano;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Milestones of a treatment's analysis.
///
/// A failed treatment is labelled with the stage it did not reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    /// Counts and metadata read and paired.
    Loaded,
    /// Normalized, log-transformed and filtered.
    Preprocessed,
    /// Tests run and p-values adjusted.
    Tested,
    /// Result table written.
    Persisted,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Loaded => "load",
            Stage::Preprocessed => "preprocess",
            Stage::Tested => "test",
            Stage::Persisted => "persist",
        };
        write!(f, "{}", name)
    }
}

/// What a completed treatment produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentSummary {
    pub n_samples: usize,
    pub n_genes_loaded: usize,
    pub zero_library_samples: Vec<String>,
    pub filter: FilterResult,
    pub results: ResultSummary,
    /// Path of the persisted result table.
    pub table: PathBuf,
    /// Path of the volcano plot, `None` if rendering failed.
    pub volcano: Option<PathBuf>,
}

/// Outcome of one treatment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TreatmentOutcome {
    Completed { summary: TreatmentSummary },
    Failed { stage: Stage, reason: String },
}

/// One treatment's entry in the run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentReport {
    pub treatment: String,
    #[serde(flatten)]
    pub outcome: TreatmentOutcome,
}

impl TreatmentReport {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, TreatmentOutcome::Completed { .. })
    }
}

/// Per-treatment outcomes of a run, in configuration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub treatments: Vec<TreatmentReport>,
}

impl RunReport {
    /// True when no treatment failed.
    pub fn all_succeeded(&self) -> bool {
        self.treatments.iter().all(TreatmentReport::is_completed)
    }

    /// Number of failed treatments.
    pub fn n_failed(&self) -> usize {
        self.treatments.iter().filter(|t| !t.is_completed()).count()
    }

    /// Look up a treatment's entry.
    pub fn get(&self, treatment: &str) -> Option<&TreatmentReport> {
        self.treatments.iter().find(|t| t.treatment == treatment)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(RnaError::from)
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "RNAlytics run")?;
        writeln!(f, "=============")?;
        for entry in &self.treatments {
            match &entry.outcome {
                TreatmentOutcome::Completed { summary } => {
                    writeln!(
                        f,
                        "{}: {} genes tested, {} with padj < 0.05 -> {}",
                        entry.treatment,
                        summary.results.total,
                        summary.results.significant_05,
                        summary.table.display()
                    )?;
                }
                TreatmentOutcome::Failed { stage, reason } => {
                    writeln!(f, "{}: FAILED during {}: {}", entry.treatment, stage, reason)?;
                }
            }
        }
        Ok(())
    }
}

/// Path of a treatment's result table.
pub fn table_path(processed_dir: &Path, treatment: &str) -> PathBuf {
    processed_dir.join(format!("deg_{}.csv", treatment))
}

/// Path of a treatment's volcano plot.
pub fn volcano_path(processed_dir: &Path, treatment: &str) -> PathBuf {
    processed_dir.join(format!("volcano_{}.png", treatment))
}

/// Drives the analysis of every configured treatment.
///
/// # Example
/// ```ignore
/// let report = Analyzer::new(PipelineConfig::default())
///     .treatments(&["CsA"])
///     .min_samples(3)
///     .run()?;
/// ```
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: PipelineConfig,
}

impl Analyzer {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Set the raw data directory.
    pub fn raw_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.raw_dir = dir.into();
        self
    }

    /// Set the output directory.
    pub fn processed_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.processed_dir = dir.into();
        self
    }

    /// Replace the treatment list.
    pub fn treatments(mut self, treatments: &[&str]) -> Self {
        self.config.treatments = treatments.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn min_samples(mut self, min_samples: usize) -> Self {
        self.config.min_samples = min_samples;
        self
    }

    pub fn target_sum(mut self, target_sum: f64) -> Self {
        self.config.target_sum = target_sum;
        self
    }

    /// Analyse every treatment in order.
    ///
    /// Errors in one treatment are recorded in the report and do not stop
    /// the others. Only an invalid configuration or an output directory
    /// that cannot be created fails the whole run.
    pub fn run(&self) -> Result<RunReport> {
        self.config.validate()?;
        std::fs::create_dir_all(&self.config.processed_dir)?;

        let mut report = RunReport::default();
        for treatment in &self.config.treatments {
            info!(treatment = %treatment, "starting analysis");
            let outcome = match self.run_treatment(treatment) {
                Ok(summary) => {
                    info!(
                        treatment = %treatment,
                        tested = summary.results.total,
                        significant = summary.results.significant_05,
                        "analysis complete"
                    );
                    TreatmentOutcome::Completed { summary }
                }
                Err((stage, e)) => {
                    error!(treatment = %treatment, %stage, error = %e, "analysis failed");
                    TreatmentOutcome::Failed {
                        stage,
                        reason: e.to_string(),
                    }
                }
            };
            report.treatments.push(TreatmentReport {
                treatment: treatment.clone(),
                outcome,
            });
        }
        Ok(report)
    }

    fn run_treatment(&self, treatment: &str) -> std::result::Result<TreatmentSummary, (Stage, RnaError)> {
        let config = &self.config;
        let at = |stage: Stage| move |e: RnaError| (stage, e);

        let mut dataset =
            load_treatment(&config.raw_dir, treatment, &config.treatments).map_err(at(Stage::Loaded))?;
        let n_samples = dataset.n_samples();
        let n_genes_loaded = dataset.n_genes();

        let preprocessing = preprocess(&mut dataset, config.target_sum, config.min_samples)
            .map_err(at(Stage::Preprocessed))?;
        if dataset.n_genes() == 0 {
            warn!(treatment, "no genes left after filtering; writing an empty table");
        }

        let table = differential_expression(&dataset, treatment, &config.control_label)
            .map_err(at(Stage::Tested))?;

        let table_file = table_path(&config.processed_dir, treatment);
        table.to_csv(&table_file).map_err(at(Stage::Persisted))?;

        let plot_file = volcano_path(&config.processed_dir, treatment);
        let volcano = match plot_volcano(&table, &plot_file, &config.volcano) {
            Ok(()) => Some(plot_file),
            Err(e) => {
                warn!(treatment, error = %e, "volcano plot not written");
                None
            }
        };

        Ok(TreatmentSummary {
            n_samples,
            n_genes_loaded,
            zero_library_samples: preprocessing.normalization.zero_library_samples,
            filter: preprocessing.filter,
            results: table.summary(),
            table: table_file,
            volcano,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DeResultTable;
    use crate::pipeline::stages::{counts_path, metadata_path};
    use std::fs;
    use tempfile::TempDir;

    fn write_treatment(raw: &Path, treatment: &str) {
        let mut counts = String::from("gene,C1,C2,C3,T1,T2,T3\n");
        counts.push_str("G1,100,110,90,300,320,280\n");
        counts.push_str("G2,50,55,45,50,52,48\n");
        counts.push_str("G3,200,190,210,80,85,75\n");
        counts.push_str("G4,0,0,3,0,0,0\n");
        fs::write(counts_path(raw, treatment), counts).unwrap();

        let mut metadata = String::from("sample,condition\n");
        for s in ["C1", "C2", "C3"] {
            metadata.push_str(&format!("{},control\n", s));
        }
        for s in ["T1", "T2", "T3"] {
            metadata.push_str(&format!("{},{}\n", s, treatment));
        }
        fs::write(metadata_path(raw, treatment), metadata).unwrap();
    }

    #[test]
    fn test_failed_treatment_does_not_block_others() {
        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_treatment(raw.path(), "CsA");

        let report = Analyzer::new(PipelineConfig::default())
            .raw_dir(raw.path())
            .processed_dir(out.path().join("processed"))
            .min_samples(5)
            .run()
            .unwrap();

        assert_eq!(report.treatments.len(), 2);
        assert!(!report.all_succeeded());
        assert_eq!(report.n_failed(), 1);

        let csa = report.get("CsA").unwrap();
        assert!(csa.is_completed());
        let voc = report.get("VOC").unwrap();
        match &voc.outcome {
            TreatmentOutcome::Failed { stage, .. } => assert_eq!(*stage, Stage::Loaded),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let table = DeResultTable::from_csv(table_path(&out.path().join("processed"), "CsA"), "CsA")
            .unwrap();
        // G4 is expressed in one sample only
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_summary_contents() {
        let raw = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_treatment(raw.path(), "VOC");

        let report = Analyzer::new(PipelineConfig::default())
            .raw_dir(raw.path())
            .processed_dir(out.path())
            .treatments(&["VOC"])
            .run()
            .unwrap();
        assert!(report.all_succeeded());

        match &report.treatments[0].outcome {
            TreatmentOutcome::Completed { summary } => {
                assert_eq!(summary.n_samples, 6);
                assert_eq!(summary.n_genes_loaded, 4);
                assert_eq!(summary.filter.n_after, 3);
                assert_eq!(summary.results.total, 3);
                assert_eq!(summary.table, table_path(out.path(), "VOC"));
                assert!(summary.table.exists());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_report_json() {
        let report = RunReport {
            treatments: vec![TreatmentReport {
                treatment: "VOC".to_string(),
                outcome: TreatmentOutcome::Failed {
                    stage: Stage::Loaded,
                    reason: "missing".to_string(),
                },
            }],
        };
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["treatments"][0]["treatment"], "VOC");
        assert_eq!(json["treatments"][0]["status"], "failed");
        assert_eq!(json["treatments"][0]["stage"], "Loaded");
        assert!(report.to_string().contains("VOC: FAILED during load"));
    }

    #[test]
    fn test_invalid_config_fails_run() {
        let result = Analyzer::new(PipelineConfig::default()).target_sum(-1.0).run();
        assert!(matches!(result, Err(RnaError::InvalidParameter(_))));
    }
}
