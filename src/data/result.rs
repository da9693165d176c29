//! Result types for Poisson differential abundance.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Differential for a single feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Differential {
    /// Feature identifier.
    pub feature_id: String,
    /// Approximate log fold change. May be NaN or infinite for degenerate features.
    pub differential: f64,
}

impl Differential {
    /// Whether the score is a finite number.
    pub fn is_finite(&self) -> bool {
        self.differential.is_finite()
    }
}

/// Group bookkeeping behind a set of differentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Covariate level used as the reference group.
    pub reference_level: String,
    /// The other covariate level.
    pub other_level: String,
    /// Number of matrix samples in the reference group.
    pub n_reference: usize,
    /// Number of matrix samples in the non-reference group.
    pub n_non_reference: usize,
    /// Total counts across reference samples.
    pub reference_library_size: u64,
    /// Total counts across non-reference samples.
    pub non_reference_library_size: u64,
}

/// Differentials for every feature of a count matrix, in matrix order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifferentialSet {
    /// Metadata column the groups were taken from.
    pub category: String,
    /// Group sizes and library totals.
    pub groups: GroupSummary,
    /// One entry per feature.
    pub results: Vec<Differential>,
}

impl DifferentialSet {
    /// Number of features.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterate over results.
    pub fn iter(&self) -> impl Iterator<Item = &Differential> {
        self.results.iter()
    }

    /// Look up the score of a feature by ID.
    pub fn get(&self, feature_id: &str) -> Option<f64> {
        self.results
            .iter()
            .find(|r| r.feature_id == feature_id)
            .map(|r| r.differential)
    }

    /// Scores in feature order.
    pub fn values(&self) -> Vec<f64> {
        self.results.iter().map(|r| r.differential).collect()
    }

    /// Number of features whose score is not finite.
    pub fn n_non_finite(&self) -> usize {
        self.results.iter().filter(|r| !r.is_finite()).count()
    }

    /// Write a two-column TSV (`FeatureID`, `Differential`).
    ///
    /// Non-finite scores are kept and written as `NaN`, `inf` or `-inf`.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)?;

        writer.write_record(["FeatureID", "Differential"])?;
        for r in &self.results {
            let score = r.differential.to_string();
            writer.write_record([r.feature_id.as_str(), score.as_str()])?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Serialize to pretty JSON. Non-finite scores become `null`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
