//! Run report written next to the artifacts.
//!
//! `manifest.json` lists every artifact of a completed run with its
//! configuration and SHA-256 checksum.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::builder::executor::Artifact;
use crate::core::config::BuildConfig;
use crate::util::fs::write_string;
use crate::util::hash::sha256_file;

/// Report file name inside the output directory.
pub const REPORT_FILE: &str = "manifest.json";

/// Summary of a completed matrix run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Start of the run, shared by every configuration
    pub build_time: DateTime<Utc>,

    /// Artifacts in matrix order
    pub artifacts: Vec<ReportEntry>,
}

/// One artifact in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub config: BuildConfig,
    pub path: PathBuf,
    pub sha256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_sha256: Option<String>,
}

impl BuildReport {
    /// Build a report, hashing every artifact on disk.
    pub fn from_artifacts(build_time: DateTime<Utc>, artifacts: &[Artifact]) -> Result<Self> {
        let artifacts = artifacts
            .iter()
            .map(|artifact| -> Result<ReportEntry> {
                let compressed_sha256 = artifact
                    .compressed
                    .as_deref()
                    .map(sha256_file)
                    .transpose()?;
                Ok(ReportEntry {
                    config: artifact.config.clone(),
                    path: artifact.path.clone(),
                    sha256: sha256_file(&artifact.path)?,
                    compressed: artifact.compressed.clone(),
                    compressed_sha256,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(BuildReport {
            build_time,
            artifacts,
        })
    }

    /// Write the report to `{out_dir}/manifest.json`.
    pub fn write(&self, out_dir: &Path) -> Result<PathBuf> {
        let path = out_dir.join(REPORT_FILE);
        let json = serde_json::to_string_pretty(self)
            .context("failed to serialize build report")?;
        write_string(&path, &json)?;
        Ok(path)
    }
}
