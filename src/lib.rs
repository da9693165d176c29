//! Poisson differential abundance for binary covariates
//!
//! Computes one log-fold-change-like score per feature of a sparse
//! sample-by-feature count table, contrasting a reference group against the
//! other level of a binary metadata column. The score is a closed-form
//! approximation to a Poisson log-linear model evaluated from aggregate
//! count totals; no iterative fitting is performed.
//!
//! # Overview
//!
//! - **data**: Core data structures (CountMatrix, Metadata, DifferentialSet)
//! - **model**: Covariate encoding and the Poisson differential
//! - **filter**: Optional removal of control samples
//! - **pipeline**: Configuration and execution
//!
//! # Example
//!
//! ```no_run
//! use poisson_cat::prelude::*;
//!
//! let counts = CountMatrix::from_tsv("table.tsv").unwrap();
//! let metadata = Metadata::from_tsv("metadata.tsv").unwrap();
//!
//! let output = PoissonCat::new("disease")
//!     .reference("healthy")
//!     .filter_control("Control")
//!     .run(&counts, &metadata)
//!     .unwrap();
//! output.differentials.to_tsv("differentials.tsv").unwrap();
//! ```

pub mod data;
pub mod error;
pub mod filter;
pub mod model;
pub mod pipeline;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::data::{
        CountMatrix, Differential, DifferentialSet, GroupSummary, Metadata, Variable,
        VariableType,
    };
    pub use crate::error::{Cardinality, DaaError, Result};
    pub use crate::filter::{
        filter_control, ControlFilterReport, ControlFiltered, DEFAULT_CONTROL_LABEL,
    };
    pub use crate::model::{
        check_sample_consistency, model_poisson_cat, poisson_differential, CovariateEncoding,
    };
    pub use crate::pipeline::{run_poisson_cat, PoissonCat, PoissonCatConfig, PoissonCatOutput};
}
