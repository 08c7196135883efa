//! Shared utilities

pub mod config;
pub mod fs;
pub mod gate;
pub mod hash;
pub mod process;

pub use config::Config;
pub use gate::AdmissionGate;
pub use process::{CommandRunner, ProcessBuilder, ProcessOutput, SystemRunner};
