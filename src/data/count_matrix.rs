//! Sparse count matrix of feature abundances across samples.

use crate::error::{DaaError, Result};
use rayon::prelude::*;
use sprs::{CsMat, TriMat};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A sparse count matrix storing feature abundances across samples.
///
/// Rows represent features (taxa/OTUs), columns represent samples.
/// Stored in CSR so that per-feature reductions walk contiguous memory.
#[derive(Debug, Clone)]
pub struct CountMatrix {
    /// Sparse matrix in CSR format (features × samples)
    data: CsMat<u64>,
    /// Feature identifiers (row names)
    feature_ids: Vec<String>,
    /// Sample identifiers (column names)
    sample_ids: Vec<String>,
}

impl CountMatrix {
    /// Create a new CountMatrix from a sparse matrix and identifiers.
    pub fn new(
        data: CsMat<u64>,
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != feature_ids.len() {
            return Err(DaaError::DimensionMismatch {
                expected: nrows,
                actual: feature_ids.len(),
            });
        }
        if ncols != sample_ids.len() {
            return Err(DaaError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }
        Ok(Self {
            data,
            feature_ids,
            sample_ids,
        })
    }

    /// Load a count matrix from a TSV file.
    ///
    /// Expected format:
    /// - Optional banner lines starting with `# ` (as written by `biom convert --to-tsv`)
    /// - Header row: feature ID header (e.g. `#OTU ID`) followed by sample IDs
    /// - Subsequent rows: feature ID followed by counts
    ///
    /// Counts may be integers or integer-valued floats such as `12.0`.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = loop {
            let line = lines
                .next()
                .ok_or_else(|| DaaError::EmptyData("Empty TSV file".to_string()))??;
            if !line.starts_with("# ") && !line.trim().is_empty() {
                break line;
            }
        };
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(DaaError::EmptyData(
                "TSV must have at least one sample".to_string(),
            ));
        }
        let sample_ids: Vec<String> = header[1..].iter().map(|s| s.trim().to_string()).collect();
        let n_samples = sample_ids.len();
        let mut seen = HashSet::with_capacity(n_samples);
        if let Some(dup) = sample_ids.iter().find(|sid| !seen.insert(sid.as_str())) {
            return Err(DaaError::InvalidParameter(format!(
                "duplicate sample ID in header: {}",
                dup
            )));
        }

        let mut triplets: Vec<(usize, usize, u64)> = Vec::new();
        let mut feature_ids: Vec<String> = Vec::new();

        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != n_samples + 1 {
                return Err(DaaError::DimensionMismatch {
                    expected: n_samples + 1,
                    actual: fields.len(),
                });
            }
            let row_idx = feature_ids.len();
            feature_ids.push(fields[0].to_string());

            for (col_idx, value_str) in fields[1..].iter().enumerate() {
                let value = parse_count(value_str).ok_or_else(|| DaaError::InvalidCount {
                    value: value_str.to_string(),
                    row: row_idx,
                    col: col_idx,
                })?;
                if value > 0 {
                    triplets.push((row_idx, col_idx, value));
                }
            }
        }

        let n_features = feature_ids.len();
        if n_features == 0 {
            return Err(DaaError::EmptyData("No features in TSV".to_string()));
        }

        let mut tri_mat = TriMat::new((n_features, n_samples));
        for (row, col, val) in triplets {
            tri_mat.add_triplet(row, col, val);
        }

        Self::new(tri_mat.to_csr(), feature_ids, sample_ids)
    }

    /// Write the count matrix to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "#OTU ID")?;
        for sample_id in &self.sample_ids {
            write!(writer, "\t{}", sample_id)?;
        }
        writeln!(writer)?;

        for (row_idx, feature_id) in self.feature_ids.iter().enumerate() {
            write!(writer, "{}", feature_id)?;
            for col_idx in 0..self.n_samples() {
                write!(writer, "\t{}", self.get(row_idx, col_idx))?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Get the value at (row, col), returning 0 for missing entries.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u64 {
        self.data.get(row, col).copied().unwrap_or(0)
    }

    /// Number of features (rows).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.data.rows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.cols()
    }

    /// Feature identifiers.
    #[inline]
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column index of a sample, if present.
    pub fn sample_index(&self, sample_id: &str) -> Option<usize> {
        self.sample_ids.iter().position(|s| s == sample_id)
    }

    /// Compute row sums (total counts per feature).
    pub fn row_sums(&self) -> Vec<u64> {
        (0..self.n_features())
            .into_par_iter()
            .map(|row| {
                self.data
                    .outer_view(row)
                    .map(|v| v.iter().map(|(_, &val)| val).sum())
                    .unwrap_or(0)
            })
            .collect()
    }

    /// Row sums restricted to the samples whose entry in `mask` is true.
    pub fn masked_row_sums(&self, mask: &[bool]) -> Result<Vec<u64>> {
        if mask.len() != self.n_samples() {
            return Err(DaaError::DimensionMismatch {
                expected: self.n_samples(),
                actual: mask.len(),
            });
        }
        Ok((0..self.n_features())
            .into_par_iter()
            .map(|row| {
                self.data
                    .outer_view(row)
                    .map(|v| {
                        v.iter()
                            .filter(|(col, _)| mask[*col])
                            .map(|(_, &val)| val)
                            .sum()
                    })
                    .unwrap_or(0)
            })
            .collect())
    }

    /// Compute column sums (library sizes per sample).
    pub fn col_sums(&self) -> Vec<u64> {
        let mut sums = vec![0u64; self.n_samples()];
        for row_vec in self.data.outer_iterator() {
            for (col, &val) in row_vec.iter() {
                sums[col] += val;
            }
        }
        sums
    }

    /// Subset the matrix to include only specified features (by index).
    pub fn subset_features(&self, indices: &[usize]) -> Result<Self> {
        let n_features = indices.len();
        let mut tri_mat = TriMat::new((n_features, self.n_samples()));
        let mut new_feature_ids = Vec::with_capacity(n_features);

        for (new_row, &old_row) in indices.iter().enumerate() {
            if old_row >= self.n_features() {
                return Err(DaaError::InvalidParameter(format!(
                    "Feature index {} out of bounds",
                    old_row
                )));
            }
            new_feature_ids.push(self.feature_ids[old_row].clone());

            if let Some(row_vec) = self.data.outer_view(old_row) {
                for (col, &val) in row_vec.iter() {
                    tri_mat.add_triplet(new_row, col, val);
                }
            }
        }

        Self::new(tri_mat.to_csr(), new_feature_ids, self.sample_ids.clone())
    }

    /// Subset the matrix to include only specified samples (by index), in the given order.
    pub fn subset_samples(&self, indices: &[usize]) -> Result<Self> {
        let n_samples = indices.len();

        let col_map: HashMap<usize, usize> = indices
            .iter()
            .enumerate()
            .map(|(new_idx, &old_idx)| (old_idx, new_idx))
            .collect();

        let mut new_sample_ids = Vec::with_capacity(n_samples);
        for &old_col in indices {
            if old_col >= self.n_samples() {
                return Err(DaaError::InvalidParameter(format!(
                    "Sample index {} out of bounds",
                    old_col
                )));
            }
            new_sample_ids.push(self.sample_ids[old_col].clone());
        }

        let mut tri_mat = TriMat::new((self.n_features(), n_samples));
        for (row, row_vec) in self.data.outer_iterator().enumerate() {
            for (old_col, &val) in row_vec.iter() {
                if let Some(&new_col) = col_map.get(&old_col) {
                    tri_mat.add_triplet(row, new_col, val);
                }
            }
        }

        Self::new(tri_mat.to_csr(), self.feature_ids.clone(), new_sample_ids)
    }

    /// Drop features whose total count is zero.
    pub fn remove_empty_features(&self) -> Result<Self> {
        let keep: Vec<usize> = self
            .row_sums()
            .iter()
            .enumerate()
            .filter(|(_, &sum)| sum > 0)
            .map(|(i, _)| i)
            .collect();
        self.subset_features(&keep)
    }

    /// Create from a dense matrix (features × samples) of integer-valued counts.
    pub fn from_dense(
        data: &nalgebra::DMatrix<f64>,
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        let mut tri_mat = TriMat::new((nrows, ncols));

        for row in 0..nrows {
            for col in 0..ncols {
                let val = data[(row, col)];
                let count = count_from_f64(val).ok_or_else(|| DaaError::InvalidCount {
                    value: val.to_string(),
                    row,
                    col,
                })?;
                if count > 0 {
                    tri_mat.add_triplet(row, col, count);
                }
            }
        }

        Self::new(tri_mat.to_csr(), feature_ids, sample_ids)
    }
}

/// Parse a single count cell, accepting integer-valued floats.
fn parse_count(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<u64>() {
        return Some(v);
    }
    count_from_f64(trimmed.parse().ok()?)
}

/// A count from a float: finite, non-negative and integer-valued.
fn count_from_f64(v: f64) -> Option<u64> {
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 {
        Some(v as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_matrix() -> CountMatrix {
        // 3 features × 4 samples
        let mut tri_mat = TriMat::new((3, 4));
        tri_mat.add_triplet(0, 0, 10);
        tri_mat.add_triplet(0, 1, 20);
        tri_mat.add_triplet(0, 3, 5);
        tri_mat.add_triplet(1, 0, 100);
        tri_mat.add_triplet(1, 1, 200);
        tri_mat.add_triplet(1, 2, 150);
        tri_mat.add_triplet(1, 3, 175);
        tri_mat.add_triplet(2, 0, 1);

        let feature_ids = vec!["otu_A".to_string(), "otu_B".to_string(), "otu_C".to_string()];
        let sample_ids = vec![
            "S1".to_string(),
            "S2".to_string(),
            "S3".to_string(),
            "S4".to_string(),
        ];

        CountMatrix::new(tri_mat.to_csr(), feature_ids, sample_ids).unwrap()
    }

    #[test]
    fn test_dimensions() {
        let mat = create_test_matrix();
        assert_eq!(mat.n_features(), 3);
        assert_eq!(mat.n_samples(), 4);
        assert_eq!(mat.sample_index("S3"), Some(2));
        assert_eq!(mat.sample_index("S9"), None);
    }

    #[test]
    fn test_dimension_mismatch() {
        let tri_mat: TriMat<u64> = TriMat::new((2, 2));
        let result = CountMatrix::new(
            tri_mat.to_csr(),
            vec!["a".into()],
            vec!["s1".into(), "s2".into()],
        );
        assert!(matches!(result, Err(DaaError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_sums() {
        let mat = create_test_matrix();
        assert_eq!(mat.row_sums(), vec![35, 625, 1]);
        assert_eq!(mat.col_sums(), vec![111, 220, 150, 180]);
    }

    #[test]
    fn test_masked_row_sums() {
        let mat = create_test_matrix();
        let sums = mat.masked_row_sums(&[false, true, false, true]).unwrap();
        assert_eq!(sums, vec![25, 375, 0]);
        assert!(mat.masked_row_sums(&[true]).is_err());
    }

    #[test]
    fn test_tsv_roundtrip() {
        let mat = create_test_matrix();
        let temp_file = NamedTempFile::new().unwrap();
        mat.to_tsv(temp_file.path()).unwrap();

        let loaded = CountMatrix::from_tsv(temp_file.path()).unwrap();
        assert_eq!(loaded.feature_ids(), mat.feature_ids());
        assert_eq!(loaded.sample_ids(), mat.sample_ids());
        for row in 0..mat.n_features() {
            for col in 0..mat.n_samples() {
                assert_eq!(loaded.get(row, col), mat.get(row, col));
            }
        }
    }

    #[test]
    fn test_biom_tsv_with_float_counts() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# Constructed from biom file").unwrap();
        writeln!(file, "#OTU ID\tS1\tS2").unwrap();
        writeln!(file, "otu_1\t3.0\t0.0").unwrap();
        writeln!(file, "otu_2\t7\t12.0").unwrap();
        file.flush().unwrap();

        let mat = CountMatrix::from_tsv(file.path()).unwrap();
        assert_eq!(mat.sample_ids(), &["S1", "S2"]);
        assert_eq!(mat.feature_ids(), &["otu_1", "otu_2"]);
        assert_eq!(mat.get(0, 0), 3);
        assert_eq!(mat.get(0, 1), 0);
        assert_eq!(mat.get(1, 1), 12);
    }

    #[test]
    fn test_rejects_fractional_and_negative_counts() {
        for bad in ["1.5", "-2", "abc"] {
            let mut file = NamedTempFile::new().unwrap();
            writeln!(file, "#OTU ID\tS1").unwrap();
            writeln!(file, "otu_1\t{}", bad).unwrap();
            file.flush().unwrap();

            let err = CountMatrix::from_tsv(file.path()).unwrap_err();
            assert!(matches!(err, DaaError::InvalidCount { row: 0, col: 0, .. }));
        }
    }

    #[test]
    fn test_subset_samples_reorders() {
        let mat = create_test_matrix();
        let subset = mat.subset_samples(&[3, 1]).unwrap();
        assert_eq!(subset.sample_ids(), &["S4", "S2"]);
        assert_eq!(subset.get(0, 0), 5);
        assert_eq!(subset.get(0, 1), 20);
    }

    #[test]
    fn test_remove_empty_features() {
        let mat = create_test_matrix();
        let subset = mat.subset_samples(&[1, 2, 3]).unwrap();
        let pruned = subset.remove_empty_features().unwrap();
        assert_eq!(pruned.feature_ids(), &["otu_A", "otu_B"]);
        assert_eq!(pruned.n_samples(), 3);
    }

    #[test]
    fn test_from_dense() {
        let dense = nalgebra::DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 4.0, 2.0]);
        let mat = CountMatrix::from_dense(
            &dense,
            vec!["f1".into(), "f2".into()],
            vec!["s1".into(), "s2".into()],
        )
        .unwrap();
        assert_eq!(mat.row_sums(), vec![1, 6]);

        for bad in [-1.0, 2.5, f64::NAN] {
            let dense = nalgebra::DMatrix::from_row_slice(1, 1, &[bad]);
            let err = CountMatrix::from_dense(&dense, vec!["f".into()], vec!["s".into()])
                .unwrap_err();
            assert!(matches!(err, DaaError::InvalidCount { row: 0, col: 0, .. }));
        }
    }

    #[test]
    fn test_rejects_duplicate_sample_ids() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "#OTU ID\tS1\tS2\tS1").unwrap();
        writeln!(file, "otu_1\t1\t2\t3").unwrap();
        file.flush().unwrap();

        let err = CountMatrix::from_tsv(file.path()).unwrap_err();
        assert!(matches!(err, DaaError::InvalidParameter(msg) if msg.contains("S1")));
    }

    #[test]
    fn test_rejects_ragged_rows() {
        for row in ["otu_1\t1", "otu_1\t1\t2\t3"] {
            let mut file = NamedTempFile::new().unwrap();
            writeln!(file, "#OTU ID\tS1\tS2").unwrap();
            writeln!(file, "otu_0\t4\t5").unwrap();
            writeln!(file, "{}", row).unwrap();
            file.flush().unwrap();

            let err = CountMatrix::from_tsv(file.path()).unwrap_err();
            assert!(matches!(err, DaaError::DimensionMismatch { expected: 3, .. }));
        }
    }
}
