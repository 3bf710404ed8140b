//! Repository reference normalization.
use std::fmt;

/// A repository reference normalized to its releases-API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    display: String,
    base: String,
}

impl RepoRef {
    /// Normalize `reference` against the API rooted at `api_url`.
    ///
    /// Accepted forms: `owner/repo`, an HTTPS browse URL (extra path segments
    /// such as `/tree/main/src` are dropped), an SSH remote
    /// (`git@host:owner/repo.git` or `ssh://git@host/owner/repo`), or an
    /// already-resolved releases-API URL, which is kept verbatim.
    ///
    /// ```
    /// use envkit_cli::release::repo::RepoRef;
    ///
    /// let api = "https://api.github.com";
    /// let a = RepoRef::parse("https://github.com/mozilla/sccache.git", api);
    /// let b = RepoRef::parse("git@github.com:mozilla/sccache", api);
    /// assert_eq!(a, b);
    /// assert_eq!(a.base_url(), "https://api.github.com/repos/mozilla/sccache/releases");
    /// ```
    #[must_use]
    pub fn parse(reference: &str, api_url: &str) -> Self {
        let api_url = api_url.trim_end_matches('/');
        let trimmed = reference.trim().trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

        if trimmed.starts_with("https://api.") || (!api_url.is_empty() && trimmed.starts_with(api_url)) {
            return Self {
                display: trimmed.to_string(),
                base: trimmed.to_string(),
            };
        }

        let slug = slug_of(trimmed);
        Self {
            base: format!("{api_url}/repos/{slug}/releases"),
            display: slug,
        }
    }

    /// `<api>/repos/<owner>/<repo>/releases`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Endpoint returning the newest release.
    #[must_use]
    pub fn latest_url(&self) -> String {
        format!("{}/latest", self.base)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display)
    }
}

/// Extract `owner/repo` from a browse URL, SSH remote, or bare slug.
fn slug_of(reference: &str) -> String {
    if reference.contains("://") {
        if let Ok(url) = url::Url::parse(reference)
            && let Some(segments) = url.path_segments()
        {
            let parts: Vec<&str> = segments.filter(|s| !s.is_empty()).take(2).collect();
            return strip_git(&parts.join("/")).to_string();
        }
        return reference.to_string();
    }
    if let Some((_, path)) = reference.rsplit_once(':') {
        return strip_git(path.trim_start_matches('/')).to_string();
    }
    reference.to_string()
}

fn strip_git(slug: &str) -> &str {
    slug.strip_suffix(".git").unwrap_or(slug)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const API: &str = "https://api.github.com";
    const BASE: &str = "https://api.github.com/repos/foo/bar/releases";

    #[test]
    fn all_forms_normalize_to_the_same_base() {
        for reference in [
            "foo/bar",
            "foo/bar.git",
            " foo/bar ",
            "https://github.com/foo/bar",
            "https://github.com/foo/bar/",
            "https://github.com/foo/bar.git",
            "https://github.com/foo/bar/tree/main/src",
            "http://github.com/foo/bar",
            "git@github.com:foo/bar.git",
            "git@github.com:foo/bar",
            "ssh://git@github.com/foo/bar.git",
            "https://api.github.com/repos/foo/bar/releases",
            "https://api.github.com/repos/foo/bar/releases/",
        ] {
            assert_eq!(RepoRef::parse(reference, API).base_url(), BASE, "{reference}");
        }
    }

    #[test]
    fn trailing_slash_on_api_url_is_ignored() {
        assert_eq!(RepoRef::parse("foo/bar", "https://api.github.com/").base_url(), BASE);
    }

    #[test]
    fn configured_api_base_is_kept_verbatim() {
        let api = "http://127.0.0.1:8080";
        let repo = RepoRef::parse("http://127.0.0.1:8080/repos/foo/bar/releases", api);
        assert_eq!(repo.base_url(), "http://127.0.0.1:8080/repos/foo/bar/releases");
        let slug = RepoRef::parse("foo/bar", api);
        assert_eq!(slug.base_url(), "http://127.0.0.1:8080/repos/foo/bar/releases");
    }

    #[test]
    fn latest_url_appends_latest() {
        assert_eq!(RepoRef::parse("foo/bar", API).latest_url(), format!("{BASE}/latest"));
    }

    #[test]
    fn display_is_the_slug() {
        assert_eq!(RepoRef::parse("https://github.com/foo/bar", API).to_string(), "foo/bar");
    }

    #[test]
    fn malformed_reference_is_passed_through() {
        let repo = RepoRef::parse("not-a-repo", API);
        assert_eq!(repo.base_url(), "https://api.github.com/repos/not-a-repo/releases");
    }
}
