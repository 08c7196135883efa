//! Command implementations

pub mod build;
pub mod completions;
pub mod list;
pub mod toolchain;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use buildmatrix::util::config::{global_config_path, load_config, CONFIG_FILE};
use buildmatrix::util::fs::find_upwards;
use buildmatrix::{Config, MatrixOptions};

use crate::cli::GlobalArgs;

/// Load configuration and resolve run options.
///
/// The project root is the directory holding `Matrix.toml`, or the current
/// directory when there is none.
pub fn load_options(global: &GlobalArgs) -> Result<(Config, MatrixOptions)> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;

    let project = match &global.config {
        Some(path) => Some(path.clone()),
        None => find_upwards(&cwd, CONFIG_FILE),
    };
    let root = project
        .as_ref()
        .and_then(|p| p.parent())
        .map(|p| if p.as_os_str().is_empty() { cwd.clone() } else { p.to_path_buf() })
        .unwrap_or_else(|| cwd.clone());

    let global_path: Option<PathBuf> = if global.no_global_config {
        None
    } else {
        global_config_path()
    };

    match &project {
        Some(path) => tracing::debug!("using {}", path.display()),
        None => tracing::debug!("no {} found; using the built-in matrix", CONFIG_FILE),
    }

    let config = load_config(global_path.as_deref(), project.as_deref())?;
    let opts = MatrixOptions::from_config(&config, &root);
    Ok((config, opts))
}

/// Resolve a path given on the command line against the current directory.
///
/// Paths from `Matrix.toml` are relative to the project root instead; see
/// [`MatrixOptions::from_config`].
pub fn cli_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    Ok(cwd.join(path))
}
