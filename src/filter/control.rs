//! Removal of control samples ahead of a two-group comparison.

use crate::data::{CountMatrix, Metadata};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Level conventionally used for control samples.
pub const DEFAULT_CONTROL_LABEL: &str = "Control";

/// What the control filter did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFilterReport {
    /// Whether any filtering happened.
    pub applied: bool,
    pub samples_before: usize,
    pub samples_after: usize,
    pub features_before: usize,
    pub features_after: usize,
}

/// Count matrix and metadata after control filtering.
#[derive(Debug, Clone)]
pub struct ControlFiltered {
    pub counts: CountMatrix,
    pub metadata: Metadata,
    pub report: ControlFilterReport,
}

/// Drop control samples so that a three-level column becomes binary.
///
/// Only applies when `category` has more than two levels and one of them is
/// `label`. Metadata rows with that level are removed, the matrix keeps only
/// the remaining metadata samples (in metadata order), and features left
/// with no counts are dropped. Otherwise the inputs are returned unchanged.
pub fn filter_control(
    counts: &CountMatrix,
    metadata: &Metadata,
    category: &str,
    label: &str,
) -> Result<ControlFiltered> {
    let levels = metadata.distinct_values(category)?;
    let has_control = levels.iter().any(|level| level.matches_label(label));

    if levels.len() <= 2 || !has_control {
        return Ok(ControlFiltered {
            counts: counts.clone(),
            metadata: metadata.clone(),
            report: ControlFilterReport {
                applied: false,
                samples_before: metadata.n_samples(),
                samples_after: metadata.n_samples(),
                features_before: counts.n_features(),
                features_after: counts.n_features(),
            },
        });
    }

    info!(
        "Number of samples pre-filtering: {}",
        metadata.n_samples()
    );
    let keep: Vec<String> = metadata
        .sample_ids()
        .iter()
        .filter(|sid| {
            !metadata
                .get(sid, category)
                .is_some_and(|value| value.matches_label(label))
        })
        .cloned()
        .collect();
    let filtered_metadata = metadata.subset_samples(&keep)?;
    info!(
        "Number of samples post-filtering: {}",
        filtered_metadata.n_samples()
    );

    let sample_indices: Vec<usize> = keep
        .iter()
        .filter_map(|sid| counts.sample_index(sid))
        .collect();
    let subset = counts.subset_samples(&sample_indices)?;
    info!(
        "Number of features pre-filtering those with 0 counts: {}",
        subset.n_features()
    );
    let filtered_counts = subset.remove_empty_features()?;
    info!(
        "Number of features post-filtering those with 0 counts: {}",
        filtered_counts.n_features()
    );

    let report = ControlFilterReport {
        applied: true,
        samples_before: metadata.n_samples(),
        samples_after: filtered_metadata.n_samples(),
        features_before: counts.n_features(),
        features_after: filtered_counts.n_features(),
    };

    Ok(ControlFiltered {
        counts: filtered_counts,
        metadata: filtered_metadata,
        report,
    })
}
