//! Core data model: build configurations, matrix axes and errors.

pub mod axes;
pub mod config;
pub mod error;
pub mod platform;

pub use axes::MatrixAxes;
pub use config::{BuildConfig, LinkMode};
pub use error::MatrixError;
