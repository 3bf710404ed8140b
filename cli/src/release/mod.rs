//! Release resolution and platform-specific asset acquisition.
//!
//! [`ReleaseClient::download`] ties the pieces together: normalize the
//! repository reference ([`repo`]), resolve the release ([`resolver`],
//! [`version`]), collapse the keyword table for the host ([`keywords`]),
//! pick the asset ([`asset`]) and fetch it through the retrying
//! [`Fetcher`](fetch::Fetcher).
pub mod asset;
pub mod clock;
pub mod error;
pub mod fetch;
pub mod http;
pub mod keywords;
pub mod model;
pub mod repo;
pub mod resolver;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;

pub use error::ReleaseError;
pub use model::{AssetInfo, ReleaseInfo};

use crate::config::Settings;
use crate::logging::Log;
use crate::platform::HostProfile;
use clock::SystemClock;
use fetch::Fetcher;
use http::UreqClient;
use keywords::{KeywordProfile, KeywordTable};
use repo::RepoRef;
use version::VersionConstraint;

/// Everything needed to download one release asset.
#[derive(Debug, Clone, Default)]
pub struct ReleaseRequest {
    /// Repository reference in any accepted form.
    pub repo: String,
    /// Version constraint; `None` or blank selects the latest release.
    pub constraint: Option<String>,
    /// Required keywords per axis.
    pub keywords: KeywordTable,
    /// Keywords the asset name must not contain.
    pub exclude: Vec<String>,
    /// Destination file name; defaults to the asset's own name.
    pub output: Option<String>,
    /// Create the destination inside a fresh temporary directory.
    pub use_temp_dir: bool,
}

/// Outcome of a successful [`ReleaseClient::download`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedAsset {
    /// Tag of the resolved release.
    pub tag: String,
    /// Name of the selected asset.
    pub asset: String,
    /// Canonical path of the downloaded file.
    pub path: PathBuf,
}

/// Front door of the release engine.
#[derive(Debug)]
pub struct ReleaseClient {
    fetcher: Fetcher,
    api_url: String,
    log: Arc<dyn Log>,
}

impl ReleaseClient {
    /// Create a client resolving repositories against `api_url`.
    #[must_use]
    pub fn new(fetcher: Fetcher, api_url: &str, log: Arc<dyn Log>) -> Self {
        Self {
            fetcher,
            api_url: api_url.trim_end_matches('/').to_string(),
            log,
        }
    }

    /// Create a client talking to the network as configured in `settings`.
    #[must_use]
    pub fn from_settings(settings: &Settings, log: Arc<dyn Log>) -> Self {
        let client = UreqClient::new(
            &settings.github.api_url,
            &settings.github.user_agent,
            settings.token(),
            settings.retry.timeout(),
        );
        let fetcher = Fetcher::new(
            Box::new(client),
            Box::new(SystemClock),
            settings.retry.policy(),
            Arc::clone(&log),
        );
        Self::new(fetcher, &settings.github.api_url, log)
    }

    /// Normalize a repository reference against this client's API.
    #[must_use]
    pub fn repo(&self, reference: &str) -> RepoRef {
        RepoRef::parse(reference, &self.api_url)
    }

    /// Resolve the release of `reference` satisfying `constraint`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::InvalidConstraint`], any fetch error, or
    /// [`ReleaseError::NoMatchingRelease`].
    pub fn resolve(
        &self,
        reference: &str,
        constraint: Option<&str>,
    ) -> Result<ReleaseInfo, ReleaseError> {
        let repo = self.repo(reference);
        let constraint = VersionConstraint::parse(constraint.unwrap_or_default())?;
        resolver::resolve(&self.fetcher, &repo, constraint.as_ref(), self.log.as_ref())
    }

    /// Resolve the release and select the asset described by `request` for
    /// `host`, without downloading anything.
    ///
    /// # Errors
    ///
    /// Returns the resolver errors and [`ReleaseError::NoMatchingAsset`].
    pub fn locate(
        &self,
        request: &ReleaseRequest,
        host: &HostProfile,
    ) -> Result<(ReleaseInfo, AssetInfo), ReleaseError> {
        let release = self.resolve(&request.repo, request.constraint.as_deref())?;
        let profile = KeywordProfile::build(&request.keywords, host, &request.exclude);
        self.log.debug(&format!(
            "asset keywords for {host}: required {:?}, excluded {:?}",
            profile.required, profile.excluded
        ));
        let asset = asset::select_asset(&release, &profile, self.log.as_ref())?.clone();
        self.log.info(&format!(
            "selected {} from release {}",
            asset.name, release.tag_name
        ));
        Ok((release, asset))
    }

    /// Resolve, select and download the asset described by `request` for
    /// `host`.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`ReleaseError`] of any stage; nothing is
    /// retried beyond what the fetcher already does.
    pub fn download(
        &self,
        request: &ReleaseRequest,
        host: &HostProfile,
    ) -> Result<DownloadedAsset, ReleaseError> {
        let (release, asset) = self.locate(request, host)?;
        let name = request.output.as_deref().unwrap_or(&asset.name);
        let path = self
            .fetcher
            .download(&asset.browser_download_url, name, request.use_temp_dir)?;
        Ok(DownloadedAsset {
            tag: release.tag_name,
            asset: asset.name,
            path,
        })
    }
}
