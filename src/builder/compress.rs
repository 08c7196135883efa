//! Executable compression as a post-build step.
//!
//! The compressor writes a sibling file and leaves the original artifact
//! untouched: `hello-...-abcd1234.exe` becomes `hello-...-abcd1234-upx.exe`.

use std::path::{Path, PathBuf};

use crate::builder::fingerprint::EXE_SUFFIX;
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Default compressor executable.
pub const DEFAULT_TOOL: &str = "upx";

/// An available compressor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressor {
    tool: String,
    suffix: String,
}

impl Compressor {
    /// Create a compressor without probing it. `suffix` defaults to the
    /// tool name.
    pub fn new(tool: impl Into<String>, suffix: Option<String>) -> Self {
        let tool = tool.into();
        let suffix = suffix.unwrap_or_else(|| {
            Path::new(&tool)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| tool.clone())
        });
        Compressor { tool, suffix }
    }

    /// Probe `tool -V`; the compressor is available when it exits zero.
    ///
    /// Called once per run, not per artifact.
    pub fn probe(runner: &dyn CommandRunner, tool: &str, suffix: Option<String>) -> Option<Self> {
        let compressor = Compressor::new(tool, suffix);
        match runner.run(&compressor.probe_command()) {
            Ok(output) if output.is_success() => Some(compressor),
            Ok(output) => {
                tracing::debug!(
                    "`{} -V` exited with {:?}; not compressing",
                    tool,
                    output.code
                );
                None
            }
            Err(e) => {
                tracing::debug!("`{}` not available ({}); not compressing", tool, e);
                None
            }
        }
    }

    /// The compressor executable.
    pub fn tool(&self) -> &str {
        &self.tool
    }

    fn probe_command(&self) -> ProcessBuilder {
        ProcessBuilder::new(&self.tool).arg("-V")
    }

    /// Path of the compressed sibling of `artifact`.
    pub fn compressed_path(&self, artifact: &Path) -> PathBuf {
        let original = artifact.to_string_lossy();
        let (stem, ext) = match original.strip_suffix(EXE_SUFFIX) {
            Some(stem) => (stem, EXE_SUFFIX),
            None => (&*original, ""),
        };
        PathBuf::from(format!("{}-{}{}", stem, self.suffix, ext))
    }

    /// Command compressing `artifact` into `output`.
    pub fn command(&self, artifact: &Path, output: &Path) -> ProcessBuilder {
        ProcessBuilder::new(&self.tool)
            .args(["-qq", "-f", "-o"])
            .arg(output)
            .arg(artifact)
    }
}
