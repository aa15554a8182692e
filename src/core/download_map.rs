//! Download maps - per-platform URL templates for app artifacts

use serde::{Deserialize, Serialize};

/// Token replaced by the release version in URL templates.
pub const VERSION_TOKEN: &str = "***VERSION***";

/// OS and CPU architecture pair, in `std::env::consts` spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub arch: &'static str,
}

impl Platform {
    pub const WINDOWS_X64: Platform = Platform::new("windows", "x86_64");
    pub const WINDOWS_X86: Platform = Platform::new("windows", "x86");
    pub const LINUX_X64: Platform = Platform::new("linux", "x86_64");
    pub const LINUX_ARM64: Platform = Platform::new("linux", "aarch64");
    pub const MAC_X64: Platform = Platform::new("macos", "x86_64");
    pub const MAC_ARM64: Platform = Platform::new("macos", "aarch64");

    pub const fn new(os: &'static str, arch: &'static str) -> Self {
        Self { os, arch }
    }

    /// The platform this process runs on
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }
    }
}

/// Per-platform download URL templates for one app. An unset field means the
/// app is not offered on that platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadMap {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows_x64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows_x86: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linux_x64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linux_arm64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_x64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_arm64: Option<String>,
}

impl DownloadMap {
    fn template_for(&self, platform: Platform) -> Option<&str> {
        let template = match (platform.os, platform.arch) {
            ("windows", "x86_64") => &self.windows_x64,
            ("windows", "x86") => &self.windows_x86,
            ("linux", "x86_64") => &self.linux_x64,
            ("linux", "aarch64") => &self.linux_arm64,
            ("macos", "x86_64") => &self.mac_x64,
            ("macos", "aarch64") => &self.mac_arm64,
            _ => &None,
        };
        template.as_deref()
    }

    /// Resolve the download URL for the given platform. `None` means the app
    /// is not offered there, which the caller must treat as normal rather
    /// than an error. Without a version the template is returned unmodified
    /// (apps without per-release URLs).
    pub fn resolve_for(&self, platform: Platform, version: Option<&str>) -> Option<String> {
        let template = self.template_for(platform)?;
        Some(match version {
            Some(v) => template.replace(VERSION_TOKEN, v),
            None => template.to_string(),
        })
    }

    /// Resolve for the running OS and architecture
    pub fn resolve(&self, version: Option<&str>) -> Option<String> {
        self.resolve_for(Platform::current(), version)
    }
}
