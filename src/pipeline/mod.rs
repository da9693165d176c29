//! Pipeline composition and execution.

mod runner;

pub use runner::{run_poisson_cat, PoissonCat, PoissonCatConfig, PoissonCatOutput};
