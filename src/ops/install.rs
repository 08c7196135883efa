//! Installing missing toolchains.
//!
//! A toolchain counts as installed when running it as `{version} version`
//! reports `version`. Missing ones are fetched with the bootstrap toolchain
//! (`go install golang.org/dl/{version}@latest`) and then asked to download
//! their own distribution (`{version} download`).

use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::builder::toolchain::{ToolchainLocator, Toolchains, VersionProbe};
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Module path of the per-version toolchain wrappers.
pub const DOWNLOADER_MODULE: &str = "golang.org/dl";

/// Default bootstrap toolchain.
pub const DEFAULT_BOOTSTRAP: &str = "go";

/// Default timeout for each installation command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// How toolchains get installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Toolchain used to install the wrappers
    pub bootstrap: String,

    /// Timeout applied to each command; exceeding it is an error
    pub timeout: Duration,
}

impl Default for InstallOptions {
    fn default() -> Self {
        InstallOptions {
            bootstrap: DEFAULT_BOOTSTRAP.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Whether the toolchain named `version` is installed and reports itself
/// correctly.
pub fn is_installed(probe: &dyn VersionProbe, version: &str) -> bool {
    match probe.reported_version(version) {
        Ok(reported) if reported == version => true,
        Ok(reported) => {
            tracing::debug!("{} reports {}", version, reported);
            false
        }
        Err(e) => {
            tracing::debug!("{} not available: {}", version, e);
            false
        }
    }
}

/// Install every toolchain in `versions` that is not available.
///
/// Returns the versions that were installed.
pub fn install_missing_toolchains(
    versions: &[String],
    locator: &ToolchainLocator,
    runner: &dyn CommandRunner,
    opts: &InstallOptions,
) -> Result<Vec<String>> {
    let toolchains = Toolchains::new(locator, runner);
    let mut installed = Vec::new();

    for version in versions {
        if is_installed(&toolchains, version) {
            continue;
        }

        tracing::info!("installing {}", version);
        let fetch = ProcessBuilder::new(&opts.bootstrap)
            .arg("install")
            .arg(format!("{}/{}@latest", DOWNLOADER_MODULE, version))
            .timeout(opts.timeout);
        run_install_step(runner, &fetch)
            .with_context(|| format!("failed to install toolchain {}", version))?;

        let download = ProcessBuilder::new(locator.executable(version))
            .arg("download")
            .timeout(opts.timeout);
        run_install_step(runner, &download)
            .with_context(|| format!("failed to download toolchain {}", version))?;

        installed.push(version.clone());
    }

    Ok(installed)
}

fn run_install_step(runner: &dyn CommandRunner, cmd: &ProcessBuilder) -> Result<()> {
    let output = runner
        .run(cmd)
        .with_context(|| format!("failed to run `{}`", cmd.display_command()))?;

    if !output.is_success() {
        bail!(
            "`{}` failed with exit code {:?}\n{}",
            cmd.display_command(),
            output.code,
            output.combined()
        );
    }
    Ok(())
}
