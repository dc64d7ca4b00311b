//! Differential expression result table.

use crate::error::{RnaError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Column order of a persisted result table.
pub const TABLE_HEADER: [&str; 5] = ["gene", "log2FoldChange", "pvalue", "treatment", "padj"];

/// Result for a single gene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeResult {
    /// Gene identifier.
    pub gene: String,
    /// mean(treated) - mean(control) of log-transformed values.
    #[serde(rename = "log2FoldChange")]
    pub log2_fold_change: f64,
    /// Raw two-sided p-value. NaN when the test is undefined.
    #[serde(rename = "pvalue")]
    pub p_value: f64,
    /// Treatment label.
    pub treatment: String,
    /// BH-adjusted p-value. NaN when `p_value` is NaN.
    pub padj: f64,
}

impl DeResult {
    /// Significant at `alpha` on the adjusted p-value. NaN is never significant.
    pub fn is_significant_at(&self, alpha: f64) -> bool {
        self.padj < alpha
    }

    /// `-log10(padj)`, the volcano y coordinate.
    pub fn neg_log10_padj(&self) -> f64 {
        -self.padj.log10()
    }
}

/// One treatment's differential expression results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeResultTable {
    /// Treatment these results belong to.
    pub treatment: String,
    /// One row per tested gene, in gene order.
    pub results: Vec<DeResult>,
}

impl DeResultTable {
    pub fn new(treatment: String, results: Vec<DeResult>) -> Self {
        Self { treatment, results }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeResult> {
        self.results.iter()
    }

    /// Count of rows with padj below `alpha`.
    pub fn n_significant(&self, alpha: f64) -> usize {
        self.results.iter().filter(|r| r.is_significant_at(alpha)).count()
    }

    /// Number of rows whose test was undefined.
    pub fn n_untested(&self) -> usize {
        self.results.iter().filter(|r| r.p_value.is_nan()).count()
    }

    /// Summary counts at the usual thresholds.
    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            total: self.len(),
            untested: self.n_untested(),
            significant_001: self.n_significant(0.001),
            significant_01: self.n_significant(0.01),
            significant_05: self.n_significant(0.05),
            significant_10: self.n_significant(0.10),
        }
    }

    /// Write the table as CSV.
    ///
    /// Floats use the shortest representation that parses back to the same
    /// value; NaN is written as an empty cell.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(TABLE_HEADER)?;
        for r in &self.results {
            writer.write_record([
                r.gene.clone(),
                format_float(r.log2_fold_change),
                format_float(r.p_value),
                r.treatment.clone(),
                format_float(r.padj),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a table written by [`DeResultTable::to_csv`].
    ///
    /// Columns are located by name, so an extra leading index column is
    /// tolerated.
    pub fn from_csv<P: AsRef<Path>>(path: P, treatment: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let header = reader.headers()?.clone();
        let position = |name: &str| {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| RnaError::MissingColumn(name.to_string()))
        };
        let gene_col = position("gene")?;
        let lfc_col = position("log2FoldChange")?;
        let p_col = position("pvalue")?;
        let padj_col = position("padj")?;
        let treatment_col = header.iter().position(|h| h == "treatment");

        let mut results = Vec::new();
        for record in reader.records() {
            let record = record?;
            let field = |idx: usize| record.get(idx).unwrap_or_default();
            results.push(DeResult {
                gene: field(gene_col).to_string(),
                log2_fold_change: parse_float(field(lfc_col), "log2FoldChange")?,
                p_value: parse_float(field(p_col), "pvalue")?,
                treatment: treatment_col
                    .map(|idx| field(idx).to_string())
                    .unwrap_or_else(|| treatment.to_string()),
                padj: parse_float(field(padj_col), "padj")?,
            });
        }

        Ok(Self::new(treatment.to_string(), results))
    }
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

fn parse_float(raw: &str, column: &str) -> Result<f64> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    raw.parse()
        .map_err(|_| RnaError::InvalidParameter(format!("Invalid {} value '{}'", column, raw)))
}

/// Summary statistics for a result table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub total: usize,
    pub untested: usize,
    pub significant_001: usize,
    pub significant_01: usize,
    pub significant_05: usize,
    pub significant_10: usize,
}

impl std::fmt::Display for ResultSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total genes tested: {}", self.total)?;
        writeln!(f, "Untestable genes:   {}", self.untested)?;
        writeln!(f, "Significant at padj < 0.001: {}", self.significant_001)?;
        writeln!(f, "Significant at padj < 0.01:  {}", self.significant_01)?;
        writeln!(f, "Significant at padj < 0.05:  {}", self.significant_05)?;
        writeln!(f, "Significant at padj < 0.10:  {}", self.significant_10)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn row(gene: &str, lfc: f64, p: f64, padj: f64) -> DeResult {
        DeResult {
            gene: gene.to_string(),
            log2_fold_change: lfc,
            p_value: p,
            treatment: "CsA".to_string(),
            padj,
        }
    }

    fn create_table() -> DeResultTable {
        DeResultTable::new(
            "CsA".to_string(),
            vec![
                row("ACTB", 1.25, 0.0001, 0.0005),
                row("GAPDH", -0.5, 0.01, 0.02),
                row("MYC", 0.2, 0.1, 0.15),
                row("TP53", 0.1 + 0.2, 0.5, 0.6),
                row("EMPTY", -0.0, f64::NAN, f64::NAN),
            ],
        )
    }

    #[test]
    fn test_summary() {
        let summary = create_table().summary();
        assert_eq!(summary.total, 5);
        assert_eq!(summary.untested, 1);
        assert_eq!(summary.significant_001, 1);
        assert_eq!(summary.significant_05, 2);
        assert_eq!(summary.significant_10, 2);
    }

    #[test]
    fn test_nan_never_significant() {
        let table = create_table();
        assert_eq!(table.n_significant(1.01), 4);
    }

    #[test]
    fn test_csv_roundtrip() {
        let table = create_table();
        let temp = NamedTempFile::new().unwrap();
        table.to_csv(temp.path()).unwrap();

        let content = std::fs::read_to_string(temp.path()).unwrap();
        assert!(content.starts_with("gene,log2FoldChange,pvalue,treatment,padj"));

        let loaded = DeResultTable::from_csv(temp.path(), "CsA").unwrap();
        assert_eq!(loaded.len(), table.len());
        for (a, b) in loaded.iter().zip(table.iter()) {
            assert_eq!(a.gene, b.gene);
            assert_eq!(a.treatment, b.treatment);
            assert_eq!(a.log2_fold_change, b.log2_fold_change);
            if b.p_value.is_nan() {
                assert!(a.p_value.is_nan());
                assert!(a.padj.is_nan());
            } else {
                assert_eq!(a.p_value, b.p_value);
                assert_eq!(a.padj, b.padj);
            }
        }
    }

    #[test]
    fn test_from_csv_with_index_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, ",gene,log2FoldChange,pvalue,treatment,padj").unwrap();
        writeln!(file, "0,ACTB,1.5,0.001,VOC,0.004").unwrap();
        writeln!(file, "1,MYC,0.0,,VOC,").unwrap();
        file.flush().unwrap();

        let table = DeResultTable::from_csv(file.path(), "VOC").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.results[0].padj, 0.004);
        assert!(table.results[1].padj.is_nan());
        assert_eq!(table.n_significant(0.05), 1);
    }

    #[test]
    fn test_from_csv_missing_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "gene,pvalue").unwrap();
        writeln!(file, "ACTB,0.1").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            DeResultTable::from_csv(file.path(), "VOC"),
            Err(RnaError::MissingColumn(_))
        ));
    }
}
