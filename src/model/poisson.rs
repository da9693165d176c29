//! Closed-form Poisson differential abundance for a binary covariate.
//!
//! Rather than fitting a Poisson log-linear model per feature, the
//! differential is evaluated directly from four aggregate totals:
//!
//! - `A`: group-weighted counts of the feature, `-Σ y·(r + 1)` where `r` is
//!   1 for reference samples and 0 otherwise, i.e. the bitwise complement of
//!   the reference indicator
//! - `B`: counts of the feature across all samples
//! - `C`: library size of the reference group
//! - `D`: library size of the non-reference group
//!
//! ```text
//! differential = ln( -(A·B·C) / (B²·D − A) )
//! ```
//!
//! `A` is never positive, so for observed features the argument reduces to
//! `(B + R)·B·C / (B²·D + B + R)` with `R` the reference-group counts, and the
//! score is finite. Features with no counts at all give `0/0` and are
//! reported as NaN; the argument is never clamped.

use crate::data::{CountMatrix, Differential, DifferentialSet, GroupSummary, Metadata, Variable};
use crate::error::{DaaError, Result};
use crate::model::covariate::CovariateEncoding;
use rayon::prelude::*;
use std::collections::HashSet;

/// Evaluate the closed-form differential for one feature.
#[inline]
pub fn poisson_differential(
    weighted_counts: f64,
    feature_total: f64,
    reference_library_size: f64,
    non_reference_library_size: f64,
) -> f64 {
    let a = weighted_counts;
    let b = feature_total;
    (-1.0 * ((a * b * reference_library_size) / (b * b * non_reference_library_size - a))).ln()
}

/// Check that every metadata sample is present in the count matrix.
pub fn check_sample_consistency(counts: &CountMatrix, metadata: &Metadata) -> Result<()> {
    let in_matrix: HashSet<&str> = counts.sample_ids().iter().map(String::as_str).collect();
    let missing: Vec<&str> = metadata
        .sample_ids()
        .iter()
        .map(String::as_str)
        .filter(|sid| !in_matrix.contains(sid))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }
    let shown: Vec<&str> = missing.iter().take(5).copied().collect();
    Err(DaaError::SampleMismatch(format!(
        "{} metadata sample(s) absent from the count matrix ({}{})",
        missing.len(),
        shown.join(", "),
        if missing.len() > shown.len() { ", ..." } else { "" }
    )))
}

/// Compute Poisson differentials for a binary metadata column.
///
/// Validation happens up front: metadata samples must all appear in the
/// matrix, then the column must exist and hold exactly two levels. The
/// reference is the first level in metadata order unless `reference` names
/// one.
///
/// Matrix samples are matched to metadata by ID. Matrix samples without
/// metadata take part in the per-feature totals but in neither group.
pub fn model_poisson_cat(
    counts: &CountMatrix,
    metadata: &Metadata,
    category: &str,
    reference: Option<&str>,
) -> Result<DifferentialSet> {
    check_sample_consistency(counts, metadata)?;
    let encoding = CovariateEncoding::from_metadata(metadata, category, reference)?;

    // Group membership per matrix column
    let membership: Vec<Option<bool>> = counts
        .sample_ids()
        .iter()
        .map(|sid| {
            if !metadata.has_sample(sid) {
                return None;
            }
            let value = metadata.get(sid, category).unwrap_or(&Variable::Missing);
            encoding.is_reference(value)
        })
        .collect();
    let reference_mask: Vec<bool> = membership.iter().map(|m| *m == Some(true)).collect();
    let other_mask: Vec<bool> = membership.iter().map(|m| *m == Some(false)).collect();

    let grouped_mask: Vec<bool> = membership.iter().map(Option::is_some).collect();

    // Reference samples weigh 2, non-reference samples 1, unannotated 0.
    let reference_counts = counts.masked_row_sums(&reference_mask)?;
    let grouped_counts = counts.masked_row_sums(&grouped_mask)?;
    let weighted_counts: Vec<f64> = grouped_counts
        .iter()
        .zip(&reference_counts)
        .map(|(&g, &r)| -((g + r) as f64))
        .collect();
    let feature_totals = counts.row_sums();
    let library_sizes = counts.col_sums();

    let group_library = |mask: &[bool]| -> u64 {
        library_sizes
            .iter()
            .zip(mask)
            .filter(|(_, &m)| m)
            .map(|(&size, _)| size)
            .sum()
    };
    let reference_library_size = group_library(&reference_mask);
    let non_reference_library_size = group_library(&other_mask);

    let results: Vec<Differential> = counts
        .feature_ids()
        .par_iter()
        .zip(weighted_counts.par_iter().zip(feature_totals.par_iter()))
        .map(|(feature_id, (&a, &b))| Differential {
            feature_id: feature_id.clone(),
            differential: poisson_differential(
                a,
                b as f64,
                reference_library_size as f64,
                non_reference_library_size as f64,
            ),
        })
        .collect();

    Ok(DifferentialSet {
        category: category.to_string(),
        groups: GroupSummary {
            reference_level: encoding.reference_level().to_string(),
            other_level: encoding.other_level().to_string(),
            n_reference: reference_mask.iter().filter(|&&m| m).count(),
            n_non_reference: other_mask.iter().filter(|&&m| m).count(),
            reference_library_size,
            non_reference_library_size,
        },
        results,
    })
}
