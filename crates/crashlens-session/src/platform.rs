//! Platform information collector
//!
//! Non-identifying operating system details stored in the continuity record
//! and attached to reports. Never includes hostname or username.

use serde::{Deserialize, Serialize};

/// Non-identifying operating system information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub os: String,
    pub arch: String,
    pub kernel: String,
}

impl PlatformInfo {
    /// Collect platform information from the current system.
    pub fn collect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            kernel: read_kernel_version(),
        }
    }

    /// One-line form, e.g. `linux x86_64 6.1.0`.
    pub fn summary(&self) -> String {
        if self.kernel.is_empty() {
            format!("{} {}", self.os, self.arch)
        } else {
            format!("{} {} {}", self.os, self.arch, self.kernel)
        }
    }
}

fn read_kernel_version() -> String {
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_platform_info() {
        let info = PlatformInfo::collect();
        assert_eq!(info.os, std::env::consts::OS);
        assert!(!info.arch.is_empty());
        assert!(info.summary().starts_with(&info.os));
    }

    #[test]
    fn test_summary_without_kernel() {
        let info = PlatformInfo {
            os: "macos".into(),
            arch: "aarch64".into(),
            kernel: String::new(),
        };
        assert_eq!(info.summary(), "macos aarch64");
    }
}
