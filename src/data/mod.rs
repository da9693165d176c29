//! Data structures for differential abundance analysis.

mod count_matrix;
mod metadata;
mod result;

pub use count_matrix::CountMatrix;
pub use metadata::{Metadata, Variable, VariableType};
pub use result::{Differential, DifferentialSet, GroupSummary};
