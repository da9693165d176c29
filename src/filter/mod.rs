//! Sample filtering applied before modelling.

pub mod control;

pub use control::{filter_control, ControlFilterReport, ControlFiltered, DEFAULT_CONTROL_LABEL};
