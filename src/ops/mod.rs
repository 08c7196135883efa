//! High-level operations.

pub mod install;
pub mod matrix;
pub mod report;
pub mod run;

pub use install::install_missing_toolchains;
pub use matrix::MatrixEnumerator;
pub use report::BuildReport;
pub use run::{plan_matrix, run_matrix, FailurePolicy, MatrixOptions, Scheduler};
