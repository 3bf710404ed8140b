//! Keyword profile builder.
//!
//! A keyword table maps an [`Axis`] (common, CPU architecture, OS, Linux
//! distribution family) to substrings an asset file name must contain. For a
//! given [`HostProfile`] the table collapses into a [`KeywordProfile`]: the
//! `common` keywords plus exactly the entries for the host's architecture, OS
//! and, on Linux, its one distribution family.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::platform::{Arch, DistroFamily, HostProfile, Os};

/// One dimension of a keyword table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Keywords required on every host.
    Common,
    /// Keywords required on one CPU architecture.
    Arch(Arch),
    /// Keywords required on one operating system.
    Os(Os),
    /// Keywords required on one Linux distribution family.
    Distro(DistroFamily),
}

impl Axis {
    /// Every axis that can be named, in display order.
    pub const ALL: [Self; 8] = [
        Self::Common,
        Self::Arch(Arch::Amd64),
        Self::Arch(Arch::Arm64),
        Self::Os(Os::Linux),
        Self::Os(Os::Darwin),
        Self::Distro(DistroFamily::DebianUbuntu),
        Self::Distro(DistroFamily::Fedora),
        Self::Distro(DistroFamily::OtherLinux),
    ];
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Common => write!(f, "common"),
            Self::Arch(arch) => write!(f, "{arch}"),
            Self::Os(os) => write!(f, "{os}"),
            Self::Distro(family) => write!(f, "{family}"),
        }
    }
}

/// An axis name that is not one of [`Axis::ALL`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "unknown keyword axis '{0}' (expected common, amd64, arm64, linux, darwin, \
     DebianUbuntuSeries, FedoraSeries or OtherLinux)"
)]
pub struct UnknownAxis(pub String);

impl FromStr for Axis {
    type Err = UnknownAxis;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|axis| axis.to_string() == s)
            .ok_or_else(|| UnknownAxis(s.to_string()))
    }
}

/// Keyword lists keyed by [`Axis`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordTable {
    entries: HashMap<Axis, Vec<String>>,
    ignored: Vec<String>,
}

impl KeywordTable {
    /// Create an empty table; it yields no required keywords.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`extend`](Self::extend).
    #[must_use]
    pub fn with<I, S>(mut self, axis: Axis, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extend(axis, keywords);
        self
    }

    /// Append keywords to the list for `axis`.
    pub fn extend<I, S>(&mut self, axis: Axis, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .entry(axis)
            .or_default()
            .extend(keywords.into_iter().map(Into::into));
    }

    /// Build a table from string-keyed lists, as found in config files.
    ///
    /// Unrecognised axis names are not an error; they are skipped and
    /// reported by [`ignored_axes`](Self::ignored_axes).
    #[must_use]
    pub fn from_named<I, K>(named: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: AsRef<str>,
    {
        let mut table = Self::new();
        for (name, keywords) in named {
            match name.as_ref().parse::<Axis>() {
                Ok(axis) => table.extend(axis, keywords),
                Err(UnknownAxis(name)) => table.ignored.push(name),
            }
        }
        table
    }

    /// Axis names dropped by [`from_named`](Self::from_named).
    #[must_use]
    pub fn ignored_axes(&self) -> &[String] {
        &self.ignored
    }

    /// Keywords registered for `axis`.
    #[must_use]
    pub fn get(&self, axis: Axis) -> &[String] {
        self.entries.get(&axis).map_or(&[], Vec::as_slice)
    }

    /// Whether no keywords are registered for any axis.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }

    /// Required keywords for `host`, in axis order: common, architecture,
    /// OS, distribution family.
    #[must_use]
    pub fn required_for(&self, host: &HostProfile) -> Vec<String> {
        let mut axes = vec![Axis::Common];
        if host.arch != Arch::Other {
            axes.push(Axis::Arch(host.arch));
        }
        if host.os != Os::Other {
            axes.push(Axis::Os(host.os));
        }
        if let Some(family) = host.distro_family() {
            axes.push(Axis::Distro(family));
        }
        axes.into_iter()
            .flat_map(|axis| self.get(axis).iter().cloned())
            .collect()
    }
}

/// Substrings an asset name must and must not contain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordProfile {
    /// Every one of these must occur in the name.
    pub required: Vec<String>,
    /// None of these may occur in the name.
    pub excluded: Vec<String>,
}

impl KeywordProfile {
    /// Collapse `table` for `host`; `excluded` is taken verbatim.
    #[must_use]
    pub fn build(table: &KeywordTable, host: &HostProfile, excluded: &[String]) -> Self {
        Self {
            required: table.required_for(host),
            excluded: excluded.to_vec(),
        }
    }

    /// Whether `name` contains every required and no excluded keyword.
    ///
    /// ```
    /// use envkit_cli::release::keywords::KeywordProfile;
    ///
    /// let profile = KeywordProfile {
    ///     required: vec!["x86_64".into(), "linux".into()],
    ///     excluded: vec!["sha256".into()],
    /// };
    /// assert!(profile.matches("tool-x86_64-linux.tar.gz"));
    /// assert!(!profile.matches("tool-x86_64-linux.tar.gz.sha256"));
    /// assert!(!profile.matches("tool-aarch64-linux.tar.gz"));
    /// ```
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.required.iter().all(|kw| name.contains(kw.as_str()))
            && !self.excluded.iter().any(|kw| name.contains(kw.as_str()))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn full_table() -> KeywordTable {
        KeywordTable::new()
            .with(Axis::Common, ["tool"])
            .with(Axis::Arch(Arch::Amd64), ["x86_64"])
            .with(Axis::Arch(Arch::Arm64), ["aarch64"])
            .with(Axis::Os(Os::Linux), ["linux"])
            .with(Axis::Os(Os::Darwin), ["darwin"])
            .with(Axis::Distro(DistroFamily::DebianUbuntu), ["deb"])
            .with(Axis::Distro(DistroFamily::Fedora), ["rpm"])
            .with(Axis::Distro(DistroFamily::OtherLinux), ["musl"])
    }

    // -----------------------------------------------------------------------
    // Axis names
    // -----------------------------------------------------------------------

    #[test]
    fn axis_names_round_trip() {
        for axis in Axis::ALL {
            assert_eq!(axis.to_string().parse::<Axis>(), Ok(axis));
        }
    }

    #[test]
    fn unknown_axis_is_rejected_by_from_str() {
        let err = "x86".parse::<Axis>().unwrap_err();
        assert_eq!(err, UnknownAxis("x86".to_string()));
        assert!("other".parse::<Axis>().is_err());
    }

    #[test]
    fn from_named_ignores_unknown_axes() {
        let table = KeywordTable::from_named([
            ("common", vec!["tar.gz".to_string()]),
            ("windows", vec!["msvc".to_string()]),
        ]);
        assert_eq!(table.get(Axis::Common), ["tar.gz"]);
        assert_eq!(table.ignored_axes(), ["windows"]);
    }

    // -----------------------------------------------------------------------
    // Required keywords per host
    // -----------------------------------------------------------------------

    #[test]
    fn debian_amd64_gets_exactly_one_family() {
        let host = HostProfile::new(Os::Linux, Arch::Amd64, Some("ubuntu"));
        assert_eq!(full_table().required_for(&host), ["tool", "x86_64", "linux", "deb"]);
    }

    #[test]
    fn fedora_arm64() {
        let host = HostProfile::new(Os::Linux, Arch::Arm64, Some("rhel"));
        assert_eq!(full_table().required_for(&host), ["tool", "aarch64", "linux", "rpm"]);
    }

    #[test]
    fn unknown_distro_uses_other_linux() {
        let host = HostProfile::new(Os::Linux, Arch::Amd64, Some("arch"));
        assert_eq!(full_table().required_for(&host), ["tool", "x86_64", "linux", "musl"]);
    }

    #[test]
    fn darwin_has_no_family() {
        let host = HostProfile::new(Os::Darwin, Arch::Arm64, None);
        assert_eq!(full_table().required_for(&host), ["tool", "aarch64", "darwin"]);
    }

    #[test]
    fn other_arch_contributes_nothing() {
        let host = HostProfile::new(Os::Linux, Arch::Other, Some("fedora"));
        assert_eq!(full_table().required_for(&host), ["tool", "linux", "rpm"]);
    }

    #[test]
    fn missing_keys_contribute_nothing() {
        let table = KeywordTable::new().with(Axis::Common, ["bar"]);
        let host = HostProfile::new(Os::Linux, Arch::Amd64, Some("debian"));
        assert_eq!(table.required_for(&host), ["bar"]);
    }

    #[test]
    fn empty_table_matches_everything() {
        let host = HostProfile::new(Os::Linux, Arch::Amd64, None);
        let table = KeywordTable::new();
        assert!(table.is_empty());
        let profile = KeywordProfile::build(&table, &host, &[]);
        assert!(profile.required.is_empty());
        assert!(profile.matches("anything.zip"));
    }

    // -----------------------------------------------------------------------
    // Matching
    // -----------------------------------------------------------------------

    #[test]
    fn excluded_keyword_rejects_candidate() {
        let host = HostProfile::new(Os::Linux, Arch::Amd64, None);
        let table = KeywordTable::new().with(Axis::Common, ["tar.gz"]);
        let profile = KeywordProfile::build(&table, &host, &["sha256".to_string()]);
        assert!(profile.matches("zellij-x86_64-unknown-linux-musl.tar.gz"));
        assert!(!profile.matches("zellij-x86_64-unknown-linux-musl.tar.gz.sha256sum"));
    }
}
