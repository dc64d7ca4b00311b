//! Sources of per-treatment summaries.

use crate::data::DeResultTable;
use crate::error::RnaError;
use crate::pipeline::table_path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Adjusted p-value below which a GO term counts as significant.
pub const GO_TERM_ALPHA: f64 = 0.05;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0}")]
    NotFound(String),
    #[error("Could not read {}: {source}", .path.display())]
    Unreadable { path: PathBuf, source: RnaError },
}

pub type RepoResult<T> = std::result::Result<T, RepositoryError>;

/// One gene of a treatment's result table, as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenePoint {
    pub gene_id: String,
    #[serde(rename = "log2FoldChange")]
    pub log2_fold_change: f64,
    pub padj: f64,
    pub significant: bool,
}

/// Read access to per-treatment summaries.
///
/// Treatment names are validated by the caller.
pub trait SummaryRepository: Send + Sync {
    /// Number of genes with adjusted p-value below `threshold`.
    fn deg_count(&self, treatment: &str, threshold: f64) -> RepoResult<usize>;

    /// Genes with a defined adjusted p-value, flagged at `threshold`.
    fn genes(&self, treatment: &str, threshold: f64) -> RepoResult<Vec<GenePoint>>;

    /// Most significant pathway, if any were recorded.
    fn top_pathway(&self, treatment: &str) -> RepoResult<Option<String>>;

    /// Number of significant GO terms.
    fn significant_terms(&self, treatment: &str) -> RepoResult<usize>;
}

/// Fixed values for demonstrations without pipeline output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubRepository;

struct StubSummary {
    deg_count: usize,
    top_pathway: &'static str,
    significant_terms: usize,
}

impl StubRepository {
    fn lookup(treatment: &str) -> RepoResult<StubSummary> {
        match treatment {
            "CsA" => Ok(StubSummary {
                deg_count: 1492,
                top_pathway: "Cell Cycle",
                significant_terms: 1134,
            }),
            "VOC" => Ok(StubSummary {
                deg_count: 489,
                top_pathway: "Protein Processing in ER",
                significant_terms: 1024,
            }),
            other => Err(RepositoryError::NotFound(format!(
                "No stub data for treatment {}",
                other
            ))),
        }
    }
}

impl SummaryRepository for StubRepository {
    fn deg_count(&self, treatment: &str, _threshold: f64) -> RepoResult<usize> {
        Ok(Self::lookup(treatment)?.deg_count)
    }

    fn genes(&self, treatment: &str, _threshold: f64) -> RepoResult<Vec<GenePoint>> {
        Self::lookup(treatment)?;
        Err(RepositoryError::NotFound(format!(
            "No gene-level results for {} in stub mode",
            treatment
        )))
    }

    fn top_pathway(&self, treatment: &str) -> RepoResult<Option<String>> {
        Ok(Some(Self::lookup(treatment)?.top_pathway.to_string()))
    }

    fn significant_terms(&self, treatment: &str) -> RepoResult<usize> {
        Ok(Self::lookup(treatment)?.significant_terms)
    }
}

#[derive(Debug, Deserialize)]
struct PathwayRow {
    pathway: String,
    padj: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GoTermRow {
    padj: Option<f64>,
}

/// Reads the tables the pipeline writes to its processed directory.
///
/// - `deg_<T>.csv`: differential expression results
/// - `pathways_<T>.csv`: columns `pathway,padj`
/// - `go_terms_<T>.csv`: columns `term,padj`
#[derive(Debug, Clone)]
pub struct FileRepository {
    processed_dir: PathBuf,
}

impl FileRepository {
    pub fn new<P: Into<PathBuf>>(processed_dir: P) -> Self {
        Self {
            processed_dir: processed_dir.into(),
        }
    }

    pub fn pathways_path(&self, treatment: &str) -> PathBuf {
        self.processed_dir.join(format!("pathways_{}.csv", treatment))
    }

    pub fn go_terms_path(&self, treatment: &str) -> PathBuf {
        self.processed_dir.join(format!("go_terms_{}.csv", treatment))
    }

    fn load_table(&self, treatment: &str) -> RepoResult<DeResultTable> {
        let path = table_path(&self.processed_dir, treatment);
        require_file(&path, treatment)?;
        DeResultTable::from_csv(&path, treatment).map_err(|source| RepositoryError::Unreadable { path, source })
    }
}

fn require_file(path: &Path, treatment: &str) -> RepoResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(RepositoryError::NotFound(format!(
            "No results for {}: {} not found",
            treatment,
            path.display()
        )))
    }
}

fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> RepoResult<Vec<T>> {
    let unreadable = |source: RnaError| RepositoryError::Unreadable {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| unreadable(e.into()))?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|e| unreadable(e.into()))
}

impl SummaryRepository for FileRepository {
    fn deg_count(&self, treatment: &str, threshold: f64) -> RepoResult<usize> {
        Ok(self.load_table(treatment)?.n_significant(threshold))
    }

    fn genes(&self, treatment: &str, threshold: f64) -> RepoResult<Vec<GenePoint>> {
        let table = self.load_table(treatment)?;
        Ok(table
            .iter()
            .filter(|r| !r.padj.is_nan())
            .map(|r| GenePoint {
                gene_id: r.gene.clone(),
                log2_fold_change: r.log2_fold_change,
                padj: r.padj,
                significant: r.is_significant_at(threshold),
            })
            .collect())
    }

    fn top_pathway(&self, treatment: &str) -> RepoResult<Option<String>> {
        let path = self.pathways_path(treatment);
        require_file(&path, treatment)?;
        let rows: Vec<PathwayRow> = read_rows(&path)?;

        let mut best: Option<(f64, String)> = None;
        for row in rows {
            let Some(padj) = row.padj.filter(|p| !p.is_nan()) else {
                continue;
            };
            if best.as_ref().map_or(true, |(current, _)| padj < *current) {
                best = Some((padj, row.pathway));
            }
        }
        Ok(best.map(|(_, pathway)| pathway))
    }

    fn significant_terms(&self, treatment: &str) -> RepoResult<usize> {
        let path = self.go_terms_path(treatment);
        require_file(&path, treatment)?;
        let rows: Vec<GoTermRow> = read_rows(&path)?;
        Ok(rows
            .iter()
            .filter(|row| row.padj.is_some_and(|p| p < GO_TERM_ALPHA))
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DeResult;
    use std::fs;
    use tempfile::TempDir;

    fn write_table(dir: &Path, treatment: &str) {
        let rows = [("G1", 2.0, 0.001), ("G2", -1.0, 0.03), ("G3", 0.2, 0.5), ("G4", 0.0, f64::NAN)];
        let results = rows
            .iter()
            .map(|&(gene, lfc, padj)| DeResult {
                gene: gene.to_string(),
                log2_fold_change: lfc,
                p_value: padj,
                treatment: treatment.to_string(),
                padj,
            })
            .collect();
        DeResultTable::new(treatment.to_string(), results)
            .to_csv(table_path(dir, treatment))
            .unwrap();
    }

    #[test]
    fn test_stub_values() {
        let repo = StubRepository;
        assert_eq!(repo.deg_count("CsA", 0.01).unwrap(), 1492);
        assert_eq!(repo.deg_count("VOC", 0.05).unwrap(), 489);
        assert_eq!(repo.top_pathway("CsA").unwrap().as_deref(), Some("Cell Cycle"));
        assert_eq!(
            repo.top_pathway("VOC").unwrap().as_deref(),
            Some("Protein Processing in ER")
        );
        assert_eq!(repo.significant_terms("CsA").unwrap(), 1134);
        assert_eq!(repo.significant_terms("VOC").unwrap(), 1024);
        assert!(matches!(repo.genes("CsA", 0.05), Err(RepositoryError::NotFound(_))));
    }

    #[test]
    fn test_file_deg_count() {
        let dir = TempDir::new().unwrap();
        write_table(dir.path(), "CsA");
        let repo = FileRepository::new(dir.path());

        assert_eq!(repo.deg_count("CsA", 0.05).unwrap(), 2);
        assert_eq!(repo.deg_count("CsA", 0.01).unwrap(), 1);
        assert_eq!(repo.deg_count("CsA", 1.0).unwrap(), 3);
    }

    #[test]
    fn test_file_genes_skip_nan() {
        let dir = TempDir::new().unwrap();
        write_table(dir.path(), "VOC");
        let repo = FileRepository::new(dir.path());

        let genes = repo.genes("VOC", 0.05).unwrap();
        assert_eq!(genes.len(), 3);
        assert_eq!(genes[0].gene_id, "G1");
        assert!(genes[0].significant);
        assert!(!genes[2].significant);
    }

    #[test]
    fn test_file_missing_table() {
        let dir = TempDir::new().unwrap();
        let repo = FileRepository::new(dir.path());
        assert!(matches!(repo.deg_count("CsA", 0.05), Err(RepositoryError::NotFound(_))));
        assert!(matches!(repo.top_pathway("CsA"), Err(RepositoryError::NotFound(_))));
        assert!(matches!(
            repo.significant_terms("CsA"),
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[test]
    fn test_file_unreadable_table() {
        let dir = TempDir::new().unwrap();
        fs::write(table_path(dir.path(), "CsA"), "gene,padj\nG1,0.1\n").unwrap();
        let repo = FileRepository::new(dir.path());
        assert!(matches!(
            repo.deg_count("CsA", 0.05),
            Err(RepositoryError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_file_enrichment() {
        let dir = TempDir::new().unwrap();
        let repo = FileRepository::new(dir.path());
        fs::write(
            repo.pathways_path("CsA"),
            "pathway,padj\nDNA Replication,0.02\nCell Cycle,0.0001\nApoptosis,\n",
        )
        .unwrap();
        fs::write(
            repo.go_terms_path("CsA"),
            "term,padj\nGO:0007049,0.001\nGO:0006260,0.049\nGO:0006915,0.05\nGO:0008150,\n",
        )
        .unwrap();

        assert_eq!(repo.top_pathway("CsA").unwrap().as_deref(), Some("Cell Cycle"));
        assert_eq!(repo.significant_terms("CsA").unwrap(), 2);
    }

    #[test]
    fn test_file_empty_pathways() {
        let dir = TempDir::new().unwrap();
        let repo = FileRepository::new(dir.path());
        fs::write(repo.pathways_path("VOC"), "pathway,padj\n").unwrap();
        assert_eq!(repo.top_pathway("VOC").unwrap(), None);
    }
}
