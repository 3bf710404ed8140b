//! Host detection: operating system, CPU architecture, and Linux distribution
//! family.
//!
//! Detection happens once, in [`HostProfile::detect`]; everything downstream
//! (keyword profiles, tool recipes) receives the resulting value explicitly so
//! that other hosts can be simulated in tests with [`HostProfile::new`].
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Detected operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    /// Linux kernel, any distribution.
    Linux,
    /// macOS.
    Darwin,
    /// Anything else (Windows, BSDs, ...).
    Other,
}

impl Os {
    /// Map a Rust `target_os` style name onto an [`Os`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "linux" => Self::Linux,
            "darwin" | "macos" => Self::Darwin,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Darwin => write!(f, "darwin"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Normalized CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// `x86_64` / `amd64`.
    Amd64,
    /// `arm64` / `aarch64`.
    Arm64,
    /// Any other architecture; matches no architecture-specific keywords.
    Other,
}

impl Arch {
    /// Normalize a kernel or toolchain architecture name.
    ///
    /// ```
    /// use envkit_cli::platform::Arch;
    ///
    /// assert_eq!(Arch::normalize("x86_64"), Arch::Amd64);
    /// assert_eq!(Arch::normalize("aarch64"), Arch::Arm64);
    /// assert_eq!(Arch::normalize("riscv64"), Arch::Other);
    /// ```
    #[must_use]
    pub fn normalize(name: &str) -> Self {
        match name {
            "x86_64" | "amd64" => Self::Amd64,
            "arm64" | "aarch64" => Self::Arm64,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amd64 => write!(f, "amd64"),
            Self::Arm64 => write!(f, "arm64"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Linux distribution family, grouped by package ecosystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistroFamily {
    /// Debian, Ubuntu and their derivatives.
    DebianUbuntu,
    /// Fedora, CentOS and RHEL.
    Fedora,
    /// Every other Linux distribution.
    OtherLinux,
}

const DEBIAN_UBUNTU_IDS: &[&str] = &["debian", "antix", "lmde", "ubuntu", "linuxmint", "pop"];
const FEDORA_IDS: &[&str] = &["fedora", "centos", "rhel"];

impl DistroFamily {
    /// Classify an `/etc/os-release` `ID` value.
    ///
    /// Each known ID belongs to exactly one family; unknown IDs fall into
    /// [`DistroFamily::OtherLinux`].
    #[must_use]
    pub fn classify(distro_id: &str) -> Self {
        if DEBIAN_UBUNTU_IDS.contains(&distro_id) {
            Self::DebianUbuntu
        } else if FEDORA_IDS.contains(&distro_id) {
            Self::Fedora
        } else {
            Self::OtherLinux
        }
    }
}

impl fmt::Display for DistroFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DebianUbuntu => write!(f, "DebianUbuntuSeries"),
            Self::Fedora => write!(f, "FedoraSeries"),
            Self::OtherLinux => write!(f, "OtherLinux"),
        }
    }
}

/// Everything the release engine needs to know about the running host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostProfile {
    /// Operating system.
    pub os: Os,
    /// Normalized CPU architecture.
    pub arch: Arch,
    /// Raw distribution ID (`ID=` in `/etc/os-release`), Linux only.
    pub distro_id: Option<String>,
}

impl HostProfile {
    /// Detect the current host.
    #[must_use]
    pub fn detect() -> Self {
        let os = Os::from_name(std::env::consts::OS);
        let distro_id = if os == Os::Linux {
            read_os_release(Path::new("/etc/os-release")).and_then(|mut m| m.remove("ID"))
        } else {
            None
        };
        Self {
            os,
            arch: Arch::normalize(std::env::consts::ARCH),
            distro_id,
        }
    }

    /// Create a host profile with explicit values.
    #[must_use]
    pub fn new(os: Os, arch: Arch, distro_id: Option<&str>) -> Self {
        Self {
            os,
            arch,
            distro_id: distro_id.map(str::to_string),
        }
    }

    /// Whether the host runs Linux.
    #[must_use]
    pub fn is_linux(&self) -> bool {
        self.os == Os::Linux
    }

    /// Distribution family of a Linux host; `None` on every other OS.
    #[must_use]
    pub fn distro_family(&self) -> Option<DistroFamily> {
        self.is_linux()
            .then(|| DistroFamily::classify(self.distro_id.as_deref().unwrap_or_default()))
    }
}

impl fmt::Display for HostProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)?;
        if let Some(family) = self.distro_family() {
            let id = self.distro_id.as_deref().unwrap_or("unknown");
            write!(f, " ({id}, {family})")?;
        }
        Ok(())
    }
}

/// Read and parse an `os-release` file. Returns `None` if it cannot be read.
fn read_os_release(path: &Path) -> Option<HashMap<String, String>> {
    std::fs::read_to_string(path)
        .ok()
        .map(|content| parse_os_release(&content))
}

/// Parse `KEY=value` lines of an `os-release` file, dropping optional quotes.
#[must_use]
pub fn parse_os_release(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}
