//! Toolchain boundary: locating toolchain executables and checking that
//! each one reports the version it is installed under.
//!
//! Toolchains are named by version: the executable for `go1.13.8` is a
//! program called `go1.13.8`, which reports itself as
//! `go version go1.13.8 linux/amd64`.

use std::path::PathBuf;

use crate::core::error::{ExitCode, MatrixError};
use crate::util::process::{find_executable, CommandRunner, ProcessBuilder};

/// Resolves toolchain versions to executables.
#[derive(Debug, Clone, Default)]
pub struct ToolchainLocator {
    dir: Option<PathBuf>,
}

impl ToolchainLocator {
    /// Locate toolchains in `dir`, or on `PATH` when `None`.
    pub fn new(dir: Option<PathBuf>) -> Self {
        ToolchainLocator { dir }
    }

    /// Executable for the toolchain named `version`.
    ///
    /// Falls back to the bare name when it is not on `PATH`; the failure
    /// then surfaces when the process is spawned.
    pub fn executable(&self, version: &str) -> PathBuf {
        match &self.dir {
            Some(dir) => dir.join(format!("{}{}", version, std::env::consts::EXE_SUFFIX)),
            None => find_executable(version).unwrap_or_else(|| PathBuf::from(version)),
        }
    }
}

/// Extract the version identifier from `version` command output: the third
/// whitespace-separated token.
pub fn parse_version_output(stdout: &str) -> Option<&str> {
    stdout.split_whitespace().nth(2)
}

/// Minor version number: the second dot-separated component of `version`.
///
/// `go1.13.8` and `1.13` both have minor version 13.
pub fn minor_version(version: &str) -> Result<u32, MatrixError> {
    version
        .split('.')
        .nth(1)
        .and_then(|minor| minor.parse().ok())
        .ok_or_else(|| MatrixError::MalformedVersion {
            version: version.to_string(),
        })
}

/// Reports the version a toolchain claims to be.
pub trait VersionProbe: Sync {
    /// Version identifier reported by the toolchain installed as `version`.
    fn reported_version(&self, version: &str) -> Result<String, MatrixError>;
}

/// Check that the toolchain installed as `version` reports `version`.
pub fn verify_version(probe: &dyn VersionProbe, version: &str) -> Result<(), MatrixError> {
    let reported = probe.reported_version(version)?;
    if reported != version {
        return Err(MatrixError::VersionMismatch {
            expected: version.to_string(),
            reported,
        });
    }
    Ok(())
}

/// Queries toolchains by running `{toolchain} version`.
pub struct Toolchains<'a> {
    locator: &'a ToolchainLocator,
    runner: &'a dyn CommandRunner,
}

impl<'a> Toolchains<'a> {
    pub fn new(locator: &'a ToolchainLocator, runner: &'a dyn CommandRunner) -> Self {
        Toolchains { locator, runner }
    }

    /// The `version` query command for `version`.
    pub fn version_command(&self, version: &str) -> ProcessBuilder {
        ProcessBuilder::new(self.locator.executable(version)).arg("version")
    }
}

impl VersionProbe for Toolchains<'_> {
    fn reported_version(&self, version: &str) -> Result<String, MatrixError> {
        let cmd = self.version_command(version);
        let output = self.runner.run(&cmd).map_err(|source| MatrixError::Spawn {
            command: cmd.display_command(),
            source,
        })?;

        if !output.is_success() {
            return Err(MatrixError::VersionQueryFailed {
                toolchain: version.to_string(),
                status: ExitCode(output.code),
                output: output.combined(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_version_output(&stdout)
            .map(str::to_string)
            .ok_or_else(|| MatrixError::UnexpectedVersionOutput {
                toolchain: version.to_string(),
                output: stdout.trim().to_string(),
            })
    }
}
