//! Statistical models for differential abundance analysis.

pub mod covariate;
pub mod poisson;

pub use covariate::CovariateEncoding;
pub use poisson::{check_sample_consistency, model_poisson_cat, poisson_differential};
