use serde::Serialize;

/// Compile-time metadata captured by `build.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildMetadata {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub git_status: &'static str,
    pub timestamp: &'static str,
    pub profile: &'static str,
}

pub const BUILD: BuildMetadata = BuildMetadata {
    version: env!("CARGO_PKG_VERSION"),
    git_hash: env!("ATTENDANCE_CORE_BUILD_HASH"),
    git_status: env!("ATTENDANCE_CORE_BUILD_STATUS"),
    timestamp: env!("ATTENDANCE_CORE_BUILD_TIMESTAMP"),
    profile: env!("ATTENDANCE_CORE_BUILD_PROFILE"),
};

impl BuildMetadata {
    /// Short form for log lines, e.g. `0.1.0 (a1b2c3d, clean, release)`.
    pub fn summary(&self) -> String {
        format!(
            "{} ({}, {}, {})",
            self.version, self.git_hash, self.git_status, self.profile
        )
    }
}
