//! Deterministic artifact naming.
//!
//! An artifact's file name is derived from its configuration alone, minus
//! the build time, so rebuilding an unchanged configuration overwrites the
//! previous artifact while any configuration change yields a new name:
//!
//! ```text
//! {name}-{version}-{platform}-{lnk}lnk[-strip][-trimpath]-{hash}[.exe]
//! ```

use std::path::{Path, PathBuf};

use crate::core::config::BuildConfig;
use crate::core::error::MatrixError;
use crate::util::hash::fnv1a32_hex;

/// Suffix for executables on platforms that require one.
pub const EXE_SUFFIX: &str = ".exe";

/// Hash of the configuration's identity (all fields but `build_time`), as
/// 8 hex digits.
pub fn fingerprint(config: &BuildConfig) -> Result<String, MatrixError> {
    let canonical = config.identity().to_canonical_json()?;
    Ok(fnv1a32_hex(&canonical))
}

/// Artifact file name for `config`.
pub fn artifact_file_name(config: &BuildConfig) -> Result<String, MatrixError> {
    let mut name = format!(
        "{}-{}-{}-{}lnk",
        config.name,
        config.toolchain_version,
        config.target_platform,
        config.link_mode.abbrev()
    );
    if config.strip_debug {
        name.push_str("-strip");
    }
    if config.trim_path {
        name.push_str("-trimpath");
    }

    name.push('-');
    name.push_str(&fingerprint(config)?);

    if config.is_windows() {
        name.push_str(EXE_SUFFIX);
    }
    Ok(name)
}

/// Full output path of the artifact for `config` under `out_dir`.
pub fn output_path(out_dir: &Path, config: &BuildConfig) -> Result<PathBuf, MatrixError> {
    Ok(out_dir.join(artifact_file_name(config)?))
}
