//! Release resolution: latest release or first release matching a constraint.
use super::error::ReleaseError;
use super::fetch::Fetcher;
use super::model::ReleaseInfo;
use super::repo::RepoRef;
use super::version::VersionConstraint;
use crate::logging::Log;

/// Resolve the release of `repo` to download.
///
/// Without a constraint the `latest` endpoint is queried. With one, the
/// release list is scanned in API order (newest first) and the first release
/// whose tag satisfies the constraint is returned; there is no fallback to
/// the latest release.
///
/// # Errors
///
/// Returns any fetch error, or [`ReleaseError::NoMatchingRelease`] when no
/// tag satisfies the constraint.
pub fn resolve(
    fetcher: &Fetcher,
    repo: &RepoRef,
    constraint: Option<&VersionConstraint>,
    log: &dyn Log,
) -> Result<ReleaseInfo, ReleaseError> {
    let Some(constraint) = constraint else {
        let url = repo.latest_url();
        log.debug(&format!("resolving latest release via {url}"));
        let release: ReleaseInfo = fetcher.get_json(&url)?;
        log.info(&format!("{repo}: latest release is {}", release.tag_name));
        return Ok(release);
    };

    log.debug(&format!(
        "resolving release matching '{constraint}' via {}",
        repo.base_url()
    ));
    let releases: Vec<ReleaseInfo> = fetcher.get_json(repo.base_url())?;
    let count = releases.len();
    let release =
        select_release(releases, constraint).ok_or_else(|| ReleaseError::NoMatchingRelease {
            repo: repo.to_string(),
            constraint: constraint.to_string(),
        })?;
    log.info(&format!(
        "{repo}: release {} satisfies '{constraint}' ({count} scanned)",
        release.tag_name
    ));
    Ok(release)
}

/// First release, in list order, whose tag satisfies `constraint`.
#[must_use]
pub fn select_release(
    releases: Vec<ReleaseInfo>,
    constraint: &VersionConstraint,
) -> Option<ReleaseInfo> {
    releases
        .into_iter()
        .find(|release| constraint.matches_tag(&release.tag_name))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::logging::test_helpers::CapturingLog;
    use crate::release::fetch::RetryPolicy;
    use crate::release::test_helpers::{RecordingClock, Scripted, ScriptedClient};

    const API: &str = "https://api.example.com";

    fn release(tag: &str) -> ReleaseInfo {
        ReleaseInfo {
            tag_name: tag.to_string(),
            assets: vec![],
        }
    }

    fn constraint(raw: &str) -> VersionConstraint {
        VersionConstraint::parse(raw).unwrap().unwrap()
    }

    fn fetcher(client: &ScriptedClient, log: Arc<CapturingLog>) -> Fetcher {
        let policy = RetryPolicy {
            retries: 0,
            ..RetryPolicy::default()
        };
        Fetcher::new(
            Box::new(client.clone()),
            Box::new(RecordingClock::at(0)),
            policy,
            log,
        )
    }

    #[test]
    fn select_single_match_regardless_of_position() {
        let releases = vec![release("v3.0.0"), release("v2.1.0"), release("v1.0.0")];
        let selected = select_release(releases, &constraint("<2")).unwrap();
        assert_eq!(selected.tag_name, "v1.0.0");
    }

    #[test]
    fn select_first_of_several_matches() {
        let releases = vec![release("v3.0.0"), release("v2.1.0"), release("v2.0.0")];
        let selected = select_release(releases, &constraint(">=2.0")).unwrap();
        assert_eq!(selected.tag_name, "v3.0.0");
    }

    #[test]
    fn select_skips_unparsable_tags() {
        let releases = vec![release("nightly"), release("v1.2.0")];
        let selected = select_release(releases, &constraint("*")).unwrap();
        assert_eq!(selected.tag_name, "v1.2.0");
    }

    #[test]
    fn select_none_when_nothing_matches() {
        let releases = vec![release("v1.0.0")];
        assert!(select_release(releases, &constraint(">=9")).is_none());
    }

    #[test]
    fn latest_endpoint_without_constraint() {
        let client = ScriptedClient::new(vec![Scripted::ok(r#"{"tag_name":"v0.8.1","assets":[]}"#)]);
        let log = Arc::new(CapturingLog::default());
        let f = fetcher(&client, log.clone());
        let repo = RepoRef::parse("foo/bar", API);

        let resolved = resolve(&f, &repo, None, log.as_ref()).unwrap();
        assert_eq!(resolved.tag_name, "v0.8.1");
        assert_eq!(
            client.requests(),
            ["https://api.example.com/repos/foo/bar/releases/latest"]
        );
    }

    #[test]
    fn list_endpoint_with_constraint() {
        let client = ScriptedClient::new(vec![Scripted::ok(
            r#"[{"tag_name":"v2.0.0"},{"tag_name":"v1.5.0"},{"tag_name":"v1.4.0"}]"#,
        )]);
        let log = Arc::new(CapturingLog::default());
        let f = fetcher(&client, log.clone());
        let repo = RepoRef::parse("foo/bar", API);

        let resolved = resolve(&f, &repo, Some(&constraint("~1.4")), log.as_ref()).unwrap();
        assert_eq!(resolved.tag_name, "v1.4.0");
        assert_eq!(client.requests(), ["https://api.example.com/repos/foo/bar/releases"]);
    }

    #[test]
    fn no_match_is_distinct_error_without_fallback() {
        let client = ScriptedClient::new(vec![Scripted::ok(r#"[{"tag_name":"v1.0.0"}]"#)]);
        let log = Arc::new(CapturingLog::default());
        let f = fetcher(&client, log.clone());
        let repo = RepoRef::parse("foo/bar", API);

        let err = resolve(&f, &repo, Some(&constraint(">=2")), log.as_ref()).unwrap_err();
        assert!(
            matches!(err, ReleaseError::NoMatchingRelease { ref repo, ref constraint }
                if repo == "foo/bar" && constraint == ">=2"),
            "{err}"
        );
        assert_eq!(client.requests().len(), 1);
    }

    #[test]
    fn error_status_on_latest_is_fatal() {
        let client = ScriptedClient::new(vec![Scripted::status(404)]);
        let log = Arc::new(CapturingLog::default());
        let f = fetcher(&client, log.clone());
        let repo = RepoRef::parse("no/such", API);
        let err = resolve(&f, &repo, None, log.as_ref()).unwrap_err();
        assert!(matches!(err, ReleaseError::Http { .. }), "{err}");
    }
}
