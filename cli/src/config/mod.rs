//! User configuration: `config.toml` sections and their defaults.
//!
//! ```toml
//! [github]
//! api_url = "https://api.github.com"
//! token_env = "GITHUB_TOKEN"
//!
//! [retry]
//! retries = 3
//! initial_delay_secs = 120
//!
//! [install]
//! bin_dir = "/usr/local/bin"
//!
//! [tools.ripgrep]
//! repo = "BurntSushi/ripgrep"
//! archive = "tar.gz"
//! binaries = ["rg"]
//! keywords = { common = ["tar.gz"], amd64 = ["x86_64"], linux = ["linux", "musl"] }
//! exclude = ["sha256"]
//! ```
pub mod toml_loader;
pub mod validation;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::release::fetch::RetryPolicy;
use crate::release::keywords::KeywordTable;
use crate::tools::Archive;
use validation::{ConfigValidator as _, ToolSpecValidator, ValidationWarning};

/// All user settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Release API access.
    pub github: GithubSettings,
    /// Retry and rate-limit behaviour of every request.
    pub retry: RetrySettings,
    /// Where tools are installed.
    pub install: InstallSettings,
    /// User-defined release-backed tools, keyed by name.
    pub tools: BTreeMap<String, ToolSpec>,
}

/// `[github]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GithubSettings {
    /// Root of the releases API.
    pub api_url: String,
    /// Environment variable holding a bearer token.
    pub token_env: String,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
            user_agent: concat!("envkit/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// `[retry]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    /// Transient failures tolerated per request.
    pub retries: u32,
    /// First backoff delay, doubled per retry.
    pub initial_delay_secs: u64,
    /// Extra wait past a rate-limit reset.
    pub rate_limit_margin_secs: u64,
    /// Rate-limit waits tolerated per request.
    pub max_rate_limit_waits: u32,
    /// Overall timeout of a single request.
    pub timeout_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            retries: policy.retries,
            initial_delay_secs: policy.initial_delay.as_secs(),
            rate_limit_margin_secs: policy.rate_limit_margin.as_secs(),
            max_rate_limit_waits: policy.max_rate_limit_waits,
            timeout_secs: 300,
        }
    }
}

impl RetrySettings {
    /// The fetcher policy described by these settings.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            initial_delay: Duration::from_secs(self.initial_delay_secs),
            rate_limit_margin: Duration::from_secs(self.rate_limit_margin_secs),
            max_rate_limit_waits: self.max_rate_limit_waits,
        }
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `[install]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallSettings {
    /// Directory receiving installed binaries.
    pub bin_dir: PathBuf,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            bin_dir: PathBuf::from("/usr/local/bin"),
        }
    }
}

/// A `[tools.<name>]` recipe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolSpec {
    /// Repository reference.
    pub repo: String,
    /// Keyword lists keyed by axis name.
    #[serde(default)]
    pub keywords: BTreeMap<String, Vec<String>>,
    /// Keywords the asset name must not contain.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Packaging of the asset.
    #[serde(default)]
    pub archive: Archive,
    /// Binaries to install from the asset.
    #[serde(default)]
    pub binaries: Vec<String>,
    /// Operating systems the recipe supports.
    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,
}

fn default_platforms() -> Vec<String> {
    vec!["linux".to_string(), "darwin".to_string()]
}

impl ToolSpec {
    /// Typed keyword table; unknown axis names are dropped.
    #[must_use]
    pub fn keyword_table(&self) -> KeywordTable {
        KeywordTable::from_named(
            self.keywords
                .iter()
                .map(|(axis, keywords)| (axis.as_str(), keywords.clone())),
        )
    }
}

impl Settings {
    /// Load settings from `path`, or from the default location when `None`.
    ///
    /// A missing default file yields the defaults; an explicitly requested
    /// file must exist.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings: Self = match path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            Some(path) => toml_loader::load_config(path)?,
            None => toml_loader::load_config(&toml_loader::default_config_path())?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings that cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, reason: &str| ConfigError::Invalid {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        if self.github.api_url.trim().is_empty() {
            return Err(invalid("github.api_url", "must not be empty"));
        }
        url::Url::parse(&self.github.api_url)
            .map_err(|e| invalid("github.api_url", &e.to_string()))?;
        if self.github.user_agent.trim().is_empty() {
            return Err(invalid("github.user_agent", "must not be empty"));
        }
        if self.retry.timeout_secs == 0 {
            return Err(invalid("retry.timeout_secs", "must be greater than zero"));
        }
        if self.install.bin_dir.as_os_str().is_empty() {
            return Err(invalid("install.bin_dir", "must not be empty"));
        }
        Ok(())
    }

    /// Non-fatal problems in user-defined tool recipes.
    #[must_use]
    pub fn warnings(&self) -> Vec<ValidationWarning> {
        self.tools
            .iter()
            .flat_map(|(name, spec)| ToolSpecValidator::new(name, spec).validate())
            .collect()
    }

    /// API token read from the configured environment variable, if set.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.github.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::release::keywords::Axis;

    fn parse(toml: &str) -> Settings {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.github.api_url, "https://api.github.com");
        assert_eq!(s.github.token_env, "GITHUB_TOKEN");
        assert_eq!(s.retry.retries, 3);
        assert_eq!(s.retry.initial_delay_secs, 120);
        assert_eq!(s.retry.rate_limit_margin_secs, 10);
        assert_eq!(s.retry.max_rate_limit_waits, 10);
        assert_eq!(s.retry.timeout_secs, 300);
        assert_eq!(s.install.bin_dir, PathBuf::from("/usr/local/bin"));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let s = parse("[retry]\nretries = 5\n");
        assert_eq!(s.retry.retries, 5);
        assert_eq!(s.retry.initial_delay_secs, 120);
        assert_eq!(s.github, GithubSettings::default());
    }

    #[test]
    fn retry_settings_map_to_policy() {
        let s = parse("[retry]\nretries = 1\ninitial_delay_secs = 2\nrate_limit_margin_secs = 3\nmax_rate_limit_waits = 4\n");
        let policy = s.retry.policy();
        assert_eq!(policy.retries, 1);
        assert_eq!(policy.initial_delay, Duration::from_secs(2));
        assert_eq!(policy.rate_limit_margin, Duration::from_secs(3));
        assert_eq!(policy.max_rate_limit_waits, 4);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Settings>("[retry]\nretires = 1\n").is_err());
    }

    #[test]
    fn zero_timeout_is_invalid() {
        let err = parse("[retry]\ntimeout_secs = 0\n").validate().unwrap_err();
        assert!(err.to_string().contains("retry.timeout_secs"), "{err}");
    }

    #[test]
    fn empty_api_url_is_invalid() {
        let err = parse("[github]\napi_url = \"\"\n").validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "github.api_url"));
    }

    #[test]
    fn tool_recipes_parse() {
        let s = parse(
            r#"
            [tools.ripgrep]
            repo = "BurntSushi/ripgrep"
            binaries = ["rg"]
            exclude = ["sha256"]
            [tools.ripgrep.keywords]
            common = ["tar.gz"]
            amd64 = ["x86_64"]
            windows = ["msvc"]
            "#,
        );
        let spec = &s.tools["ripgrep"];
        assert_eq!(spec.archive, Archive::TarGz);
        assert_eq!(spec.platforms, ["linux", "darwin"]);
        let table = spec.keyword_table();
        assert_eq!(table.get(Axis::Common), ["tar.gz"]);
        assert_eq!(table.ignored_axes(), ["windows"]);
        assert_eq!(s.warnings().len(), 1);
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[install]\nbin_dir = \"/opt/bin\"\n").unwrap();
        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.install.bin_dir, PathBuf::from("/opt/bin"));
    }

    #[test]
    fn token_from_unset_variable_is_none() {
        let mut s = Settings::default();
        s.github.token_env = "ENVKIT_TEST_TOKEN_THAT_IS_NEVER_SET".to_string();
        assert_eq!(s.token(), None);
    }
}
