//! Compiler command construction.
//!
//! Turns a [`BuildConfig`] into the concrete compiler invocation:
//!
//! ```text
//! {toolchain} build -o {output} -ldflags "{ldflags}" [-trimpath] {entry}
//! ```
//!
//! with the target platform selected through the environment.

use std::path::{Path, PathBuf};

use crate::builder::fingerprint::output_path;
use crate::builder::toolchain::ToolchainLocator;
use crate::core::config::BuildConfig;
use crate::core::error::MatrixError;
use crate::util::process::ProcessBuilder;

/// Default identifier receiving the configuration JSON.
pub const DEFAULT_SYMBOL: &str = "main.info";

/// Default environment variable selecting the target platform.
pub const DEFAULT_PLATFORM_ENV: &str = "GOOS";

/// Default source entry point.
pub const DEFAULT_ENTRY: &str = "main.go";

/// Linker flags that strip the symbol table and DWARF data.
pub const STRIP_FLAGS: &str = "-s -w";

/// Settings shared by every build command of a run.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Source entry point passed last on the command line
    pub entry: String,

    /// Directory receiving all artifacts
    pub out_dir: PathBuf,

    /// Identifier set to the configuration JSON via `-X`
    pub symbol: String,

    /// Environment variable selecting the target platform
    pub platform_env: String,

    /// Working directory for the compiler
    pub workdir: Option<PathBuf>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        BuildSettings {
            entry: DEFAULT_ENTRY.to_string(),
            out_dir: PathBuf::from("dist"),
            symbol: DEFAULT_SYMBOL.to_string(),
            platform_env: DEFAULT_PLATFORM_ENV.to_string(),
            workdir: None,
        }
    }
}

/// Linker flags for `config`.
///
/// Embeds the full configuration as indented JSON so the binary can report
/// how it was built, then selects the link mode and optionally strips.
pub fn ldflags(config: &BuildConfig, symbol: &str) -> Result<String, MatrixError> {
    let mut flags = format!(
        "-X '{}={}' -linkmode={}",
        symbol,
        config.to_pretty_json()?,
        config.link_mode
    );
    if config.strip_debug {
        flags.push(' ');
        flags.push_str(STRIP_FLAGS);
    }
    Ok(flags)
}

/// A fully resolved compiler invocation.
#[derive(Debug, Clone)]
pub struct BuildCommand {
    /// The process to run
    pub process: ProcessBuilder,

    /// Where the artifact will be written
    pub output: PathBuf,
}

impl BuildCommand {
    /// Build the compiler invocation for `config`.
    pub fn for_config(
        config: &BuildConfig,
        settings: &BuildSettings,
        locator: &ToolchainLocator,
    ) -> Result<Self, MatrixError> {
        let output = output_path(&settings.out_dir, config)?;

        let mut args = vec![
            "build".to_string(),
            "-o".to_string(),
            output.to_string_lossy().into_owned(),
            "-ldflags".to_string(),
            ldflags(config, &settings.symbol)?,
        ];
        if config.trim_path {
            args.push("-trimpath".to_string());
        }
        args.push(settings.entry.clone());

        let mut process = ProcessBuilder::new(locator.executable(&config.toolchain_version))
            .args(args)
            .env(&settings.platform_env, &config.target_platform);
        if let Some(ref dir) = settings.workdir {
            process = process.cwd(dir);
        }

        Ok(BuildCommand { process, output })
    }

    /// Output path of the artifact.
    pub fn output(&self) -> &Path {
        &self.output
    }
}
