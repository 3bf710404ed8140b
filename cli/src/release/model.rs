//! Release API payload types.
use serde::Deserialize;

/// One published release, as returned by the releases API.
///
/// Only the fields the resolver needs are deserialized; everything else in
/// the payload is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseInfo {
    /// Git tag the release was cut from (e.g. `v0.8.1`).
    pub tag_name: String,
    /// Downloadable files attached to the release, in API order.
    #[serde(default)]
    pub assets: Vec<AssetInfo>,
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetInfo {
    /// File name, matched against the keyword profile.
    pub name: String,
    /// Direct download URL.
    pub browser_download_url: String,
}
