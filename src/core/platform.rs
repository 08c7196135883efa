//! Host platform naming.

/// Platform identifier of the machine running the matrix, in the naming
/// the toolchain uses for its target platform variable.
pub fn host_platform() -> &'static str {
    platform_name(std::env::consts::OS)
}

/// Map a Rust `target_os` name to the toolchain's platform name.
pub fn platform_name(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}
