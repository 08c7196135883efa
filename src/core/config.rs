//! The build configuration value type.
//!
//! A [`BuildConfig`] describes exactly one cell of the build matrix. It is
//! created by the enumerator, read by the fingerprinter and the command
//! builder, and dropped when its build task completes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::MatrixError;

/// Linker strategy for the final binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// The toolchain's own linker; can cross-compile.
    Internal,
    /// The host's native linker; host platform only.
    External,
}

impl LinkMode {
    /// Name as passed to `-linkmode=`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkMode::Internal => "internal",
            LinkMode::External => "external",
        }
    }

    /// Three-letter abbreviation used in artifact file names.
    pub fn abbrev(&self) -> &'static str {
        &self.as_str()[..3]
    }
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "internal" => Ok(LinkMode::Internal),
            "external" => Ok(LinkMode::External),
            _ => Err(format!(
                "unknown link mode `{}` (expected `internal` or `external`)",
                s
            )),
        }
    }
}

/// One build combination.
///
/// Field order is the canonical serialization order and therefore part of
/// the fingerprint; do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Logical name of the binary being built
    pub name: String,

    /// Toolchain identifier, e.g. `go1.13.8`
    pub toolchain_version: String,

    /// Target operating system, e.g. `linux`
    pub target_platform: String,

    /// Linker strategy
    pub link_mode: LinkMode,

    /// Strip debug symbols
    pub strip_debug: bool,

    /// Trim filesystem paths from the binary
    pub trim_path: bool,

    /// Start of the matrix run; informational only
    pub build_time: DateTime<Utc>,
}

impl BuildConfig {
    /// Copy of this configuration with `build_time` zeroed.
    ///
    /// Two configurations with equal identities always produce the same
    /// artifact name.
    pub fn identity(&self) -> BuildConfig {
        BuildConfig {
            build_time: DateTime::<Utc>::default(),
            ..self.clone()
        }
    }

    /// Compact canonical JSON of the full configuration.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>, MatrixError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Indented JSON, as embedded into the built binary.
    pub fn to_pretty_json(&self) -> Result<String, MatrixError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether the target platform uses the `.exe` suffix.
    pub fn is_windows(&self) -> bool {
        self.target_platform == "windows"
    }
}

impl fmt::Display for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} linkmode={}",
            self.name, self.toolchain_version, self.target_platform, self.link_mode
        )?;
        if self.strip_debug {
            write!(f, " strip")?;
        }
        if self.trim_path {
            write!(f, " trimpath")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> BuildConfig {
        BuildConfig {
            name: "hello".to_string(),
            toolchain_version: "go1.13.8".to_string(),
            target_platform: "linux".to_string(),
            link_mode: LinkMode::Internal,
            strip_debug: true,
            trim_path: false,
            build_time: Utc.with_ymd_and_hms(2020, 2, 14, 10, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_link_mode_parse_and_display() {
        assert_eq!("internal".parse::<LinkMode>().unwrap(), LinkMode::Internal);
        assert_eq!("EXTERNAL".parse::<LinkMode>().unwrap(), LinkMode::External);
        assert!("gold".parse::<LinkMode>().is_err());
        assert_eq!(LinkMode::External.to_string(), "external");
    }

    #[test]
    fn test_link_mode_abbrev() {
        assert_eq!(LinkMode::Internal.abbrev(), "int");
        assert_eq!(LinkMode::External.abbrev(), "ext");
    }

    #[test]
    fn test_identity_zeroes_only_build_time() {
        let config = sample();
        let identity = config.identity();

        assert_eq!(identity.build_time, DateTime::<Utc>::default());
        assert_eq!(identity.name, config.name);
        assert_eq!(identity.toolchain_version, config.toolchain_version);
        assert_eq!(identity.link_mode, config.link_mode);
        assert_eq!(identity.strip_debug, config.strip_debug);
    }

    #[test]
    fn test_canonical_json_field_order() {
        let canonical = sample().identity().to_canonical_json().unwrap();
        let json = String::from_utf8(canonical).unwrap();
        assert_eq!(
            json,
            r#"{"name":"hello","toolchain_version":"go1.13.8","target_platform":"linux","link_mode":"internal","strip_debug":true,"trim_path":false,"build_time":"1970-01-01T00:00:00Z"}"#
        );
    }

    #[test]
    fn test_pretty_json_round_trips() {
        let config = sample();
        let json = config.to_pretty_json().unwrap();
        assert!(json.contains("\n  \"name\": \"hello\""));

        let parsed: BuildConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            sample().to_string(),
            "hello go1.13.8 linux linkmode=internal strip"
        );
    }
}
