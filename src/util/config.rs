//! Configuration file support.
//!
//! Two configuration file locations are read:
//! - Global: `~/.buildmatrix/config.toml` - User-wide defaults
//! - Project: `Matrix.toml` - found by walking up from the current directory
//!
//! Project config takes precedence over global config. Every value is
//! optional; unset values fall back to the built-in matrix.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::config::LinkMode;
use crate::util::fs::read_to_string;

/// Project configuration file name.
pub const CONFIG_FILE: &str = "Matrix.toml";

/// Buildmatrix configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Matrix axes
    pub matrix: MatrixTable,

    /// Build settings
    pub build: BuildTable,

    /// Compression settings
    pub compress: CompressTable,

    /// Toolchain settings
    pub toolchain: ToolchainTable,
}

/// The `[matrix]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixTable {
    /// Artifact base name
    pub name: Option<String>,

    /// Toolchain versions (e.g. `go1.13.8`)
    pub versions: Option<Vec<String>>,

    /// Target platforms (e.g. `linux`)
    pub platforms: Option<Vec<String>>,

    /// Trim-path values to build
    pub trim_path: Option<Vec<bool>>,

    /// Link modes to build
    pub link_modes: Option<Vec<LinkMode>>,

    /// Strip values to build
    pub strip: Option<Vec<bool>>,
}

/// The `[build]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildTable {
    /// Source entry point passed to the compiler
    pub entry: Option<String>,

    /// Output directory for all artifacts
    pub out_dir: Option<PathBuf>,

    /// Number of parallel jobs (None = available parallelism)
    pub jobs: Option<usize>,

    /// Identifier receiving the configuration JSON via `-X`
    pub symbol: Option<String>,

    /// Environment variable selecting the target platform
    pub platform_env: Option<String>,

    /// Keep building after a task fails
    pub keep_going: Option<bool>,
}

/// The `[compress]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressTable {
    /// Compress artifacts when the tool is available
    pub enabled: Option<bool>,

    /// Compressor executable
    pub tool: Option<String>,

    /// Suffix inserted into compressed file names (default: tool name)
    pub suffix: Option<String>,
}

/// The `[toolchain]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainTable {
    /// Directory holding one executable per toolchain version
    pub dir: Option<PathBuf>,

    /// Install missing toolchains before building
    pub install_missing: Option<bool>,

    /// Toolchain used to install the others
    pub bootstrap: Option<String>,

    /// Timeout for each installation command, in seconds
    pub timeout_secs: Option<u64>,
}

/// Take `other` when it is set.
fn merge_opt<T>(base: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *base = other;
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = read_to_string(path).context("failed to read config file")?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        let Config {
            matrix,
            build,
            compress,
            toolchain,
        } = other;

        merge_opt(&mut self.matrix.name, matrix.name);
        merge_opt(&mut self.matrix.versions, matrix.versions);
        merge_opt(&mut self.matrix.platforms, matrix.platforms);
        merge_opt(&mut self.matrix.trim_path, matrix.trim_path);
        merge_opt(&mut self.matrix.link_modes, matrix.link_modes);
        merge_opt(&mut self.matrix.strip, matrix.strip);

        merge_opt(&mut self.build.entry, build.entry);
        merge_opt(&mut self.build.out_dir, build.out_dir);
        merge_opt(&mut self.build.jobs, build.jobs);
        merge_opt(&mut self.build.symbol, build.symbol);
        merge_opt(&mut self.build.platform_env, build.platform_env);
        merge_opt(&mut self.build.keep_going, build.keep_going);

        merge_opt(&mut self.compress.enabled, compress.enabled);
        merge_opt(&mut self.compress.tool, compress.tool);
        merge_opt(&mut self.compress.suffix, compress.suffix);

        merge_opt(&mut self.toolchain.dir, toolchain.dir);
        merge_opt(&mut self.toolchain.install_missing, toolchain.install_missing);
        merge_opt(&mut self.toolchain.bootstrap, toolchain.bootstrap);
        merge_opt(&mut self.toolchain.timeout_secs, toolchain.timeout_secs);
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (`Matrix.toml`)
/// 2. Global config (`~/.buildmatrix/config.toml`)
/// 3. Defaults
///
/// A project config that exists but cannot be parsed is an error; a broken
/// global config only produces a warning.
pub fn load_config(global_path: Option<&Path>, project_path: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global) = global_path {
        config.merge(Config::load_or_default(global));
    }

    if let Some(project) = project_path {
        config.merge(Config::load(project)?);
    }

    Ok(config)
}

/// Get the global config directory (`~/.buildmatrix`).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".buildmatrix"))
}

/// Get the global config path (`~/.buildmatrix/config.toml`).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}
