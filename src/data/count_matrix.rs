//! Raw RNA-seq count matrix with sparse storage.

use crate::error::{RnaError, Result};
use nalgebra::DMatrix;
use sprs::{CsMat, TriMat};
use std::collections::HashSet;
use std::path::Path;

/// A sparse matrix of raw read counts.
///
/// Rows are genes, columns are samples. Stored in CSR so that per-gene
/// non-zero counts are cheap.
#[derive(Debug, Clone)]
pub struct CountMatrix {
    /// Sparse matrix in CSR format (genes × samples)
    data: CsMat<f64>,
    /// Gene identifiers (row names)
    gene_ids: Vec<String>,
    /// Sample identifiers (column names)
    sample_ids: Vec<String>,
}

impl CountMatrix {
    /// Create a new CountMatrix from a sparse matrix and identifiers.
    pub fn new(data: CsMat<f64>, gene_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != gene_ids.len() {
            return Err(RnaError::DimensionMismatch {
                expected: nrows,
                actual: gene_ids.len(),
            });
        }
        if ncols != sample_ids.len() {
            return Err(RnaError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }
        ensure_unique("gene", &gene_ids)?;
        ensure_unique("sample", &sample_ids)?;
        Ok(Self {
            data,
            gene_ids,
            sample_ids,
        })
    }

    /// Build a count matrix from dense rows (one `Vec` per gene).
    pub fn from_rows(rows: &[Vec<f64>], gene_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let n_samples = sample_ids.len();
        let mut tri_mat = TriMat::new((rows.len(), n_samples));
        for (row, values) in rows.iter().enumerate() {
            if values.len() != n_samples {
                return Err(RnaError::DimensionMismatch {
                    expected: n_samples,
                    actual: values.len(),
                });
            }
            for (col, &value) in values.iter().enumerate() {
                let gene = gene_ids.get(row).map(String::as_str).unwrap_or("?");
                check_count(value, &value.to_string(), gene, &sample_ids[col])?;
                if value > 0.0 {
                    tri_mat.add_triplet(row, col, value);
                }
            }
        }
        Self::new(tri_mat.to_csr(), gene_ids, sample_ids)
    }

    /// Load a count matrix from a CSV file.
    ///
    /// Expected format:
    /// - First row: header; the first cell labels the gene index (may be
    ///   empty), the remaining cells are sample IDs
    /// - Subsequent rows: gene ID followed by one non-negative count per sample
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let header = reader.headers()?.clone();
        if header.len() < 2 {
            return Err(RnaError::EmptyData(
                "Count matrix must have at least one sample column".to_string(),
            ));
        }
        let sample_ids: Vec<String> = header.iter().skip(1).map(String::from).collect();

        let mut triplets: Vec<(usize, usize, f64)> = Vec::new();
        let mut gene_ids: Vec<String> = Vec::new();

        for record in reader.records() {
            let record = record?;
            let row_idx = gene_ids.len();
            let gene_id = record.get(0).unwrap_or_default().to_string();

            for (col_idx, raw) in record.iter().skip(1).enumerate() {
                let value: f64 = raw.parse().map_err(|_| RnaError::InvalidCount {
                    value: raw.to_string(),
                    gene: gene_id.clone(),
                    sample: sample_ids[col_idx].clone(),
                })?;
                check_count(value, raw, &gene_id, &sample_ids[col_idx])?;
                if value > 0.0 {
                    triplets.push((row_idx, col_idx, value));
                }
            }
            gene_ids.push(gene_id);
        }

        if gene_ids.is_empty() {
            return Err(RnaError::EmptyData("No genes in count matrix".to_string()));
        }

        let mut tri_mat = TriMat::new((gene_ids.len(), sample_ids.len()));
        for (row, col, val) in triplets {
            tri_mat.add_triplet(row, col, val);
        }

        Self::new(tri_mat.to_csr(), gene_ids, sample_ids)
    }

    /// Write the count matrix as CSV in the same layout `from_csv` reads.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec![String::new()];
        header.extend(self.sample_ids.iter().cloned());
        writer.write_record(&header)?;

        for (row, gene_id) in self.gene_ids.iter().enumerate() {
            let mut record = Vec::with_capacity(self.n_samples() + 1);
            record.push(gene_id.clone());
            record.extend((0..self.n_samples()).map(|col| self.get(row, col).to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Get the value at (row, col), returning 0 for missing entries.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data.get(row, col).copied().unwrap_or(0.0)
    }

    /// Number of genes (rows).
    #[inline]
    pub fn n_genes(&self) -> usize {
        self.data.rows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.cols()
    }

    /// Total number of non-zero entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.data.nnz()
    }

    /// Gene identifiers.
    #[inline]
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Compute column sums (library sizes per sample).
    pub fn col_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.n_samples()];
        for row_vec in self.data.outer_iterator() {
            for (col, &val) in row_vec.iter() {
                sums[col] += val;
            }
        }
        sums
    }

    /// Convert to a dense matrix.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.n_genes(), self.n_samples());
        for (row, row_vec) in self.data.outer_iterator().enumerate() {
            for (col, &val) in row_vec.iter() {
                dense[(row, col)] = val;
            }
        }
        dense
    }
}

fn check_count(value: f64, raw: &str, gene: &str, sample: &str) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(RnaError::InvalidCount {
            value: raw.to_string(),
            gene: gene.to_string(),
            sample: sample.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn ensure_unique(kind: &'static str, ids: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(RnaError::DuplicateId {
                kind,
                id: id.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_matrix() -> CountMatrix {
        // 3 genes × 4 samples
        let rows = vec![
            vec![10.0, 20.0, 0.0, 5.0],
            vec![100.0, 200.0, 150.0, 175.0],
            vec![1.0, 0.0, 0.0, 0.0],
        ];
        let gene_ids = vec!["GENE_A".to_string(), "GENE_B".to_string(), "GENE_C".to_string()];
        let sample_ids = vec![
            "S1".to_string(),
            "S2".to_string(),
            "S3".to_string(),
            "S4".to_string(),
        ];
        CountMatrix::from_rows(&rows, gene_ids, sample_ids).unwrap()
    }

    #[test]
    fn test_dimensions() {
        let mat = create_test_matrix();
        assert_eq!(mat.n_genes(), 3);
        assert_eq!(mat.n_samples(), 4);
        assert_eq!(mat.nnz(), 8);
    }

    #[test]
    fn test_get_values() {
        let mat = create_test_matrix();
        assert_eq!(mat.get(0, 0), 10.0);
        assert_eq!(mat.get(0, 2), 0.0);
        assert_eq!(mat.get(2, 0), 1.0);
    }

    #[test]
    fn test_col_sums() {
        let mat = create_test_matrix();
        assert_eq!(mat.col_sums(), vec![111.0, 220.0, 150.0, 180.0]);
    }

    #[test]
    fn test_csv_roundtrip() {
        let mat = create_test_matrix();
        let temp_file = NamedTempFile::new().unwrap();
        mat.to_csv(temp_file.path()).unwrap();

        let loaded = CountMatrix::from_csv(temp_file.path()).unwrap();
        assert_eq!(loaded.gene_ids(), mat.gene_ids());
        assert_eq!(loaded.sample_ids(), mat.sample_ids());
        assert_eq!(loaded.to_dense(), mat.to_dense());
    }

    #[test]
    fn test_from_csv_pandas_layout() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, ",S1,S2").unwrap();
        writeln!(file, "ACTB,12,0").unwrap();
        writeln!(file, "GAPDH,3.5,7").unwrap();
        file.flush().unwrap();

        let mat = CountMatrix::from_csv(file.path()).unwrap();
        assert_eq!(mat.sample_ids(), &["S1", "S2"]);
        assert_eq!(mat.gene_ids(), &["ACTB", "GAPDH"]);
        assert_eq!(mat.get(1, 0), 3.5);
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "gene,S1,S2").unwrap();
        writeln!(file, "ACTB,12,-1").unwrap();
        file.flush().unwrap();

        let err = CountMatrix::from_csv(file.path()).unwrap_err();
        assert!(matches!(err, RnaError::InvalidCount { .. }));
    }

    #[test]
    fn test_non_numeric_count_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "gene,S1").unwrap();
        writeln!(file, "ACTB,lots").unwrap();
        file.flush().unwrap();

        assert!(CountMatrix::from_csv(file.path()).is_err());
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "gene,S1,S2").unwrap();
        writeln!(file, "ACTB,1").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            CountMatrix::from_csv(file.path()),
            Err(RnaError::Csv(_))
        ));
    }

    #[test]
    fn test_duplicate_gene_rejected() {
        let rows = vec![vec![1.0], vec![2.0]];
        let result = CountMatrix::from_rows(
            &rows,
            vec!["ACTB".into(), "ACTB".into()],
            vec!["S1".into()],
        );
        assert!(matches!(result, Err(RnaError::DuplicateId { kind: "gene", .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = CountMatrix::from_csv("/nonexistent/counts.csv");
        assert!(result.is_err());
    }
}
