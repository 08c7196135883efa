//! Build matrix enumeration.
//!
//! [`MatrixEnumerator`] walks the cartesian product of the matrix axes in a
//! fixed order (version, platform, trim-path, link mode, strip; last axis
//! varies fastest) and yields only feasible combinations:
//!
//! - trim-path requires a toolchain with minor version 13 or later;
//! - external linking requires the target platform to be the host platform.

use chrono::{DateTime, Utc};

use crate::builder::toolchain::{minor_version, verify_version, VersionProbe};
use crate::core::axes::MatrixAxes;
use crate::core::config::{BuildConfig, LinkMode};
use crate::core::error::MatrixError;

/// First minor version supporting `-trimpath`.
pub const TRIMPATH_MIN_MINOR: u32 = 13;

/// Whether a toolchain with minor version `minor` can build for `platform`
/// with the given trim-path and link-mode settings when running on `host`.
pub fn is_feasible(
    minor: u32,
    trim_path: bool,
    link_mode: LinkMode,
    platform: &str,
    host: &str,
) -> bool {
    if trim_path && minor < TRIMPATH_MIN_MINOR {
        return false;
    }
    if link_mode == LinkMode::External && platform != host {
        // cannot cross-compile using the external linker
        return false;
    }
    true
}

/// Lazy, one-shot iterator over the feasible configurations of a matrix.
///
/// Each toolchain version is checked once, when the walk first reaches it:
/// its minor version must parse, and when a probe is attached the toolchain
/// must report the version it is named after. A failed check yields one
/// `Err` and ends the iteration.
pub struct MatrixEnumerator<'a> {
    axes: &'a MatrixAxes,
    name: String,
    host: String,
    build_time: DateTime<Utc>,
    probe: Option<&'a dyn VersionProbe>,
    next: usize,
    total: usize,
    current_version: Option<(usize, u32)>,
    failed: bool,
}

impl<'a> MatrixEnumerator<'a> {
    /// Enumerate `axes` for artifact `name` on host platform `host`.
    pub fn new(
        axes: &'a MatrixAxes,
        name: impl Into<String>,
        host: impl Into<String>,
        build_time: DateTime<Utc>,
    ) -> Self {
        MatrixEnumerator {
            axes,
            name: name.into(),
            host: host.into(),
            build_time,
            probe: None,
            next: 0,
            total: axes.product_len(),
            current_version: None,
            failed: false,
        }
    }

    /// Check every visited toolchain's self-reported version with `probe`.
    pub fn with_probe(mut self, probe: &'a dyn VersionProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Split a flat index into per-axis indices, last axis fastest.
    fn decompose(&self, mut index: usize) -> [usize; 5] {
        let radices = [
            self.axes.versions.len(),
            self.axes.platforms.len(),
            self.axes.trim_path.len(),
            self.axes.link_modes.len(),
            self.axes.strip.len(),
        ];
        let mut digits = [0; 5];
        for (digit, radix) in digits.iter_mut().zip(radices).rev() {
            *digit = index % radix;
            index /= radix;
        }
        digits
    }

    /// Minor version of the toolchain at `index`, checking it on first visit.
    fn visit_version(&mut self, index: usize) -> Result<u32, MatrixError> {
        if let Some((cached, minor)) = self.current_version {
            if cached == index {
                return Ok(minor);
            }
        }

        let version = &self.axes.versions[index];
        if let Some(probe) = self.probe {
            verify_version(probe, version)?;
        }
        let minor = minor_version(version)?;
        tracing::debug!("toolchain {} (minor {})", version, minor);

        self.current_version = Some((index, minor));
        Ok(minor)
    }
}

impl Iterator for MatrixEnumerator<'_> {
    type Item = Result<BuildConfig, MatrixError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.failed && self.next < self.total {
            let [v, p, t, l, s] = self.decompose(self.next);
            self.next += 1;

            let minor = match self.visit_version(v) {
                Ok(minor) => minor,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            };

            let platform = &self.axes.platforms[p];
            let trim_path = self.axes.trim_path[t];
            let link_mode = self.axes.link_modes[l];
            if !is_feasible(minor, trim_path, link_mode, platform, &self.host) {
                continue;
            }

            return Some(Ok(BuildConfig {
                name: self.name.clone(),
                toolchain_version: self.axes.versions[v].clone(),
                target_platform: platform.clone(),
                link_mode,
                strip_debug: self.axes.strip[s],
                trim_path,
                build_time: self.build_time,
            }));
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            (0, Some(self.total - self.next))
        }
    }
}
