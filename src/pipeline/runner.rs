//! Composition of the optional control filter and the Poisson model.

use crate::data::{CountMatrix, DifferentialSet, Metadata};
use crate::error::{DaaError, Result};
use crate::filter::{filter_control, ControlFilterReport, DEFAULT_CONTROL_LABEL};
use crate::model::model_poisson_cat;
use serde::{Deserialize, Serialize};
use tracing::debug;

fn default_control_label() -> String {
    DEFAULT_CONTROL_LABEL.to_string()
}

/// Analysis configuration for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoissonCatConfig {
    /// Name of the analysis.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Metadata column holding the binary covariate.
    pub category: String,
    /// Reference level; the first level in metadata order when absent.
    #[serde(default)]
    pub reference: Option<String>,
    /// Drop control samples before modelling.
    #[serde(default)]
    pub filter_control: bool,
    /// Level identifying control samples.
    #[serde(default = "default_control_label")]
    pub control_label: String,
}

impl PoissonCatConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(DaaError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(DaaError::from)
    }
}

/// Output of a full run.
#[derive(Debug, Clone)]
pub struct PoissonCatOutput {
    pub differentials: DifferentialSet,
    pub control_filter: ControlFilterReport,
}

/// Builder for configuring and running a Poisson differential analysis.
#[derive(Debug, Clone)]
pub struct PoissonCat {
    config: PoissonCatConfig,
}

impl PoissonCat {
    /// Analyse `category` with default settings.
    pub fn new(category: &str) -> Self {
        Self {
            config: PoissonCatConfig {
                name: "poisson-cat".to_string(),
                description: None,
                category: category.to_string(),
                reference: None,
                filter_control: false,
                control_label: default_control_label(),
            },
        }
    }

    /// Create from a config.
    pub fn from_config(config: &PoissonCatConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Set the analysis name.
    pub fn name(mut self, name: &str) -> Self {
        self.config.name = name.to_string();
        self
    }

    /// Set the reference level.
    pub fn reference(mut self, reference: &str) -> Self {
        self.config.reference = Some(reference.to_string());
        self
    }

    /// Enable control filtering with the given label.
    pub fn filter_control(mut self, label: &str) -> Self {
        self.config.filter_control = true;
        self.config.control_label = label.to_string();
        self
    }

    /// The configuration this builder will run.
    pub fn config(&self) -> &PoissonCatConfig {
        &self.config
    }

    /// Run the analysis.
    pub fn run(&self, counts: &CountMatrix, metadata: &Metadata) -> Result<PoissonCatOutput> {
        let config = &self.config;
        debug!(name = %config.name, category = %config.category, "running analysis");

        let (differentials, control_filter) = if config.filter_control {
            let filtered =
                filter_control(counts, metadata, &config.category, &config.control_label)?;
            let differentials = model_poisson_cat(
                &filtered.counts,
                &filtered.metadata,
                &config.category,
                config.reference.as_deref(),
            )?;
            (differentials, filtered.report)
        } else {
            let differentials = model_poisson_cat(
                counts,
                metadata,
                &config.category,
                config.reference.as_deref(),
            )?;
            let report = ControlFilterReport {
                applied: false,
                samples_before: metadata.n_samples(),
                samples_after: metadata.n_samples(),
                features_before: counts.n_features(),
                features_after: counts.n_features(),
            };
            (differentials, report)
        };

        debug!(
            reference = %differentials.groups.reference_level,
            n_features = differentials.len(),
            n_non_finite = differentials.n_non_finite(),
            "analysis complete"
        );

        Ok(PoissonCatOutput {
            differentials,
            control_filter,
        })
    }
}

/// Run the analysis described by `config`.
pub fn run_poisson_cat(
    counts: &CountMatrix,
    metadata: &Metadata,
    config: &PoissonCatConfig,
) -> Result<PoissonCatOutput> {
    PoissonCat::from_config(config).run(counts, metadata)
}
