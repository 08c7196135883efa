//! Build task construction and execution.
//!
//! This module turns one build configuration into a compiler invocation,
//! names its artifact, and runs it together with the optional compression
//! step.

pub mod command;
pub mod compress;
pub mod executor;
pub mod fingerprint;
pub mod toolchain;

pub use command::{BuildCommand, BuildSettings};
pub use compress::Compressor;
pub use executor::{Artifact, BuildExecutor};
pub use fingerprint::{artifact_file_name, fingerprint, output_path};
pub use toolchain::{ToolchainLocator, Toolchains, VersionProbe};
