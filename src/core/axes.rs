//! Matrix axes: the input dimensions of the build matrix.

use serde::{Deserialize, Serialize};

use crate::core::config::LinkMode;

/// Toolchain versions built when no configuration overrides them.
pub const DEFAULT_VERSIONS: &[&str] = &[
    "go1.10.8",
    "go1.11.13",
    "go1.12.17",
    "go1.13.8",
    "go1.14",
];

/// Target platforms built when no configuration overrides them.
pub const DEFAULT_PLATFORMS: &[&str] = &["linux", "darwin", "windows"];

/// The value lists whose cartesian product forms the matrix.
///
/// Axes are plain data; the enumerator never embeds its own literals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixAxes {
    pub versions: Vec<String>,
    pub platforms: Vec<String>,
    pub trim_path: Vec<bool>,
    pub link_modes: Vec<LinkMode>,
    pub strip: Vec<bool>,
}

impl Default for MatrixAxes {
    fn default() -> Self {
        MatrixAxes {
            versions: DEFAULT_VERSIONS.iter().map(|s| s.to_string()).collect(),
            platforms: DEFAULT_PLATFORMS.iter().map(|s| s.to_string()).collect(),
            trim_path: vec![false, true],
            link_modes: vec![LinkMode::Internal, LinkMode::External],
            strip: vec![false, true],
        }
    }
}

impl MatrixAxes {
    /// Size of the unfiltered cartesian product.
    pub fn product_len(&self) -> usize {
        self.versions.len()
            * self.platforms.len()
            * self.trim_path.len()
            * self.link_modes.len()
            * self.strip.len()
    }

    /// Whether any axis is empty, making the matrix empty.
    pub fn is_empty(&self) -> bool {
        self.product_len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_axes() {
        let axes = MatrixAxes::default();
        assert_eq!(axes.versions.len(), 5);
        assert_eq!(axes.platforms, vec!["linux", "darwin", "windows"]);
        assert_eq!(axes.product_len(), 5 * 3 * 2 * 2 * 2);
    }

    #[test]
    fn test_empty_axis_empties_matrix() {
        let axes = MatrixAxes {
            strip: vec![],
            ..MatrixAxes::default()
        };
        assert!(axes.is_empty());
    }
}
