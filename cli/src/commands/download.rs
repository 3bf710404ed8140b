//! Command: download the release asset matching this host.
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::{DownloadOpts, GlobalOpts};
use crate::logging::{Log, Logger};
use crate::platform::HostProfile;
use crate::release::keywords::{Axis, KeywordTable};
use crate::release::{ReleaseClient, ReleaseRequest};

use super::CommandSetup;

/// Translate command-line options into a release request.
#[must_use]
pub fn request_from(opts: &DownloadOpts) -> ReleaseRequest {
    let mut keywords = KeywordTable::new().with(Axis::Common, opts.kwd.iter().cloned());
    for (axis, keyword) in &opts.kwd_for {
        keywords.extend(*axis, [keyword.clone()]);
    }
    ReleaseRequest {
        repo: opts.repo.clone(),
        constraint: opts.constraint.clone(),
        keywords,
        exclude: opts.exclude.clone(),
        output: Some(opts.output.clone()),
        use_temp_dir: opts.temp_dir,
    }
}

/// Download, or in dry-run mode only locate, the asset for `request`.
///
/// # Errors
///
/// Returns the first fatal release error.
pub fn fetch(
    releases: &ReleaseClient,
    request: &ReleaseRequest,
    host: &HostProfile,
    dry_run: bool,
    log: &dyn Log,
) -> Result<()> {
    log.stage(&format!("Resolving {}", releases.repo(&request.repo)));
    if dry_run {
        let (release, asset) = releases
            .locate(request, host)
            .with_context(|| format!("locating release asset of {}", request.repo))?;
        log.dry_run(&format!(
            "would download {} ({}) as {}",
            asset.name,
            release.tag_name,
            request.output.as_deref().unwrap_or(&asset.name)
        ));
        return Ok(());
    }
    let downloaded = releases
        .download(request, host)
        .with_context(|| format!("downloading release asset of {}", request.repo))?;
    log.info(&format!(
        "{} {} saved to {}",
        downloaded.asset,
        downloaded.tag,
        downloaded.path.display()
    ));
    println!("{}", downloaded.path.display());
    Ok(())
}

/// Run the download-github-release command.
///
/// # Errors
///
/// Returns an error if configuration loading fails or the release cannot be
/// resolved, matched or downloaded.
pub fn run(global: &GlobalOpts, opts: &DownloadOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let releases = ReleaseClient::from_settings(&setup.settings, log.clone());
    let request = request_from(opts);
    fetch(&releases, &request, &setup.host, global.dry_run, log.as_ref())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::test_helpers::CapturingLog;
    use crate::platform::{Arch, Os};
    use crate::release::fetch::{Fetcher, RetryPolicy};
    use crate::release::test_helpers::{RecordingClock, Scripted, ScriptedClient};

    const RELEASE: &str = r#"{"tag_name":"v1.2.0","assets":[
        {"name":"tool-x86_64-linux.tar.gz","browser_download_url":"https://dl.example.com/a"},
        {"name":"tool-aarch64-darwin.tar.gz","browser_download_url":"https://dl.example.com/b"}
    ]}"#;

    fn opts(output: &str) -> DownloadOpts {
        DownloadOpts {
            repo: "owner/tool".to_string(),
            constraint: None,
            kwd: vec!["tar.gz".to_string()],
            kwd_for: vec![
                (Axis::Arch(Arch::Amd64), "x86_64".to_string()),
                (Axis::Os(Os::Linux), "linux".to_string()),
            ],
            exclude: vec![],
            output: output.to_string(),
            temp_dir: false,
        }
    }

    fn client(script: Vec<Scripted>, log: &Arc<CapturingLog>) -> (ReleaseClient, ScriptedClient) {
        let http = ScriptedClient::new(script);
        let fetcher = Fetcher::new(
            Box::new(http.clone()),
            Box::new(RecordingClock::at(0)),
            RetryPolicy::default(),
            log.clone(),
        );
        (
            ReleaseClient::new(fetcher, "https://api.example.com", log.clone()),
            http,
        )
    }

    #[test]
    fn request_from_options() {
        let request = request_from(&opts("out.tar.gz"));
        assert_eq!(request.repo, "owner/tool");
        assert_eq!(request.keywords.get(Axis::Common), ["tar.gz"]);
        assert_eq!(request.keywords.get(Axis::Arch(Arch::Amd64)), ["x86_64"]);
        assert_eq!(request.keywords.get(Axis::Os(Os::Linux)), ["linux"]);
        assert_eq!(request.output.as_deref(), Some("out.tar.gz"));
        assert!(!request.use_temp_dir);
    }

    #[test]
    fn dry_run_locates_without_downloading() {
        let log = Arc::new(CapturingLog::default());
        let (releases, http) = client(vec![Scripted::ok(RELEASE)], &log);
        let host = HostProfile::new(Os::Linux, Arch::Amd64, Some("ubuntu"));
        fetch(&releases, &request_from(&opts("tool.tgz")), &host, true, log.as_ref()).unwrap();
        assert_eq!(
            http.requests(),
            ["https://api.example.com/repos/owner/tool/releases/latest"]
        );
        assert!(log.contains("would download tool-x86_64-linux.tar.gz (v1.2.0) as tool.tgz"));
    }

    #[test]
    fn downloads_selected_asset() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("tool.tar.gz");
        let log = Arc::new(CapturingLog::default());
        let (releases, http) = client(
            vec![Scripted::ok(RELEASE), Scripted::bytes(b"archive".to_vec())],
            &log,
        );
        let host = HostProfile::new(Os::Linux, Arch::Amd64, None);
        fetch(
            &releases,
            &request_from(&opts(&output.to_string_lossy())),
            &host,
            false,
            log.as_ref(),
        )
        .unwrap();
        assert_eq!(http.requests()[1], "https://dl.example.com/a");
        assert_eq!(std::fs::read(&output).unwrap(), b"archive");
    }

    #[test]
    fn no_asset_for_host_is_an_error() {
        let log = Arc::new(CapturingLog::default());
        let (releases, _) = client(vec![Scripted::ok(RELEASE)], &log);
        let host = HostProfile::new(Os::Darwin, Arch::Amd64, None);
        let err = fetch(&releases, &request_from(&opts("x")), &host, true, log.as_ref())
            .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.starts_with("locating release asset of owner/tool"), "{msg}");
        assert!(msg.contains("no asset"), "{msg}");
    }
}
