//! Single build task execution.
//!
//! A task builds one configuration and, when a compressor is available,
//! compresses the result. Any failing process fails the task with the full
//! configuration and the captured output attached.

use std::path::PathBuf;

use serde::Serialize;

use crate::builder::command::{BuildCommand, BuildSettings};
use crate::builder::compress::Compressor;
use crate::builder::toolchain::ToolchainLocator;
use crate::core::config::BuildConfig;
use crate::core::error::{ExitCode, MatrixError};
use crate::util::process::{CommandRunner, ProcessBuilder, ProcessOutput};

/// An artifact produced by a build task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// Configuration the artifact was built from
    pub config: BuildConfig,

    /// Path of the built artifact
    pub path: PathBuf,

    /// Path of the compressed copy, if one was produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed: Option<PathBuf>,
}

/// Run `cmd`, failing unless it exits zero.
///
/// The error carries the command line, combined output and the canonical
/// JSON of `config`.
pub fn run_checked(
    runner: &dyn CommandRunner,
    cmd: &ProcessBuilder,
    what: &str,
    config: &BuildConfig,
) -> Result<ProcessOutput, MatrixError> {
    let output = runner.run(cmd).map_err(|source| MatrixError::Spawn {
        command: cmd.display_command(),
        source,
    })?;

    if !output.is_success() {
        return Err(MatrixError::ProcessFailed {
            what: what.to_string(),
            command: cmd.display_command(),
            status: ExitCode(output.code),
            output: output.combined(),
            config: config.to_pretty_json()?,
        });
    }

    Ok(output)
}

/// Executes build tasks.
pub struct BuildExecutor<'a> {
    runner: &'a dyn CommandRunner,
    settings: &'a BuildSettings,
    locator: &'a ToolchainLocator,
    compressor: Option<&'a Compressor>,
}

impl<'a> BuildExecutor<'a> {
    /// Create a new build executor.
    pub fn new(
        runner: &'a dyn CommandRunner,
        settings: &'a BuildSettings,
        locator: &'a ToolchainLocator,
    ) -> Self {
        BuildExecutor {
            runner,
            settings,
            locator,
            compressor: None,
        }
    }

    /// Compress every artifact with `compressor`.
    pub fn compressor(mut self, compressor: Option<&'a Compressor>) -> Self {
        self.compressor = compressor;
        self
    }

    /// Build one configuration, then compress it if a compressor is set.
    pub fn execute(&self, config: &BuildConfig) -> Result<Artifact, MatrixError> {
        let build = BuildCommand::for_config(config, self.settings, self.locator)?;
        tracing::debug!("building {}", build.output().display());
        run_checked(self.runner, &build.process, "build", config)?;

        let compressed = match self.compressor {
            Some(compressor) => {
                let target = compressor.compressed_path(build.output());
                tracing::debug!("compressing into {}", target.display());
                let cmd = compressor.command(build.output(), &target);
                run_checked(self.runner, &cmd, "compression", config)?;
                Some(target)
            }
            None => None,
        };

        Ok(Artifact {
            config: config.clone(),
            path: build.output,
            compressed,
        })
    }
}
