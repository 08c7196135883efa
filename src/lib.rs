//! Buildmatrix - build one artifact per toolchain/platform/flag combination
//!
//! This crate provides the library behind the `buildmatrix` binary: matrix
//! enumeration and feasibility filtering, deterministic artifact naming,
//! compiler command construction, and bounded-concurrency execution.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities for buildmatrix unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides a scripted process runner.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{
    axes::MatrixAxes,
    config::{BuildConfig, LinkMode},
    error::MatrixError,
};

pub use builder::executor::Artifact;
pub use ops::run::{run_matrix, FailurePolicy, MatrixOptions};
pub use util::config::Config;
