//! Asset selection against a keyword profile.
use super::error::ReleaseError;
use super::keywords::KeywordProfile;
use super::model::{AssetInfo, ReleaseInfo};
use crate::logging::Log;

/// Pick the asset of `release` matching `profile`.
///
/// Assets are scanned in API order and the **last** candidate wins.
///
/// # Errors
///
/// Returns [`ReleaseError::NoMatchingAsset`] when no asset matches.
pub fn select_asset<'a>(
    release: &'a ReleaseInfo,
    profile: &KeywordProfile,
    log: &dyn Log,
) -> Result<&'a AssetInfo, ReleaseError> {
    let mut selected = None;
    for asset in &release.assets {
        if profile.matches(&asset.name) {
            log.debug(&format!("candidate asset: {}", asset.name));
            selected = Some(asset);
        } else {
            log.debug(&format!("skipping asset: {}", asset.name));
        }
    }
    selected.ok_or_else(|| ReleaseError::NoMatchingAsset {
        tag: release.tag_name.clone(),
        required: profile.required.clone(),
        excluded: profile.excluded.clone(),
    })
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::logging::test_helpers::CapturingLog;

    fn release(names: &[&str]) -> ReleaseInfo {
        ReleaseInfo {
            tag_name: "v1.0.0".to_string(),
            assets: names
                .iter()
                .map(|name| AssetInfo {
                    name: (*name).to_string(),
                    browser_download_url: format!("https://example.com/{name}"),
                })
                .collect(),
        }
    }

    fn profile(required: &[&str], excluded: &[&str]) -> KeywordProfile {
        KeywordProfile {
            required: required.iter().map(|s| (*s).to_string()).collect(),
            excluded: excluded.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn last_candidate_wins() {
        let r = release(&["tool-linux-gnu.tar.gz", "tool-linux-musl.tar.gz", "tool-darwin.tar.gz"]);
        let log = CapturingLog::default();
        let asset = select_asset(&r, &profile(&["linux"], &[]), &log).unwrap();
        assert_eq!(asset.name, "tool-linux-musl.tar.gz");
        assert_eq!(log.at("debug").len(), 3);
    }

    #[test]
    fn exclusions_filter_checksums() {
        let r = release(&["tool-linux.tar.gz", "tool-linux.tar.gz.sha256"]);
        let log = CapturingLog::default();
        let asset = select_asset(&r, &profile(&["linux"], &["sha256"]), &log).unwrap();
        assert_eq!(asset.name, "tool-linux.tar.gz");
        assert!(log.contains("skipping asset: tool-linux.tar.gz.sha256"));
    }

    #[test]
    fn no_candidate_is_an_error() {
        let r = release(&["tool-darwin.tar.gz"]);
        let err = select_asset(&r, &profile(&["linux"], &["pre"]), &CapturingLog::default())
            .unwrap_err();
        match err {
            ReleaseError::NoMatchingAsset {
                tag,
                required,
                excluded,
            } => {
                assert_eq!(tag, "v1.0.0");
                assert_eq!(required, ["linux"]);
                assert_eq!(excluded, ["pre"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_release_has_no_asset() {
        let r = release(&[]);
        assert!(select_asset(&r, &profile(&[], &[]), &CapturingLog::default()).is_err());
    }
}
