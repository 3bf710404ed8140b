//! Non-fatal checks of user-defined tool recipes.
use crate::platform::Os;

use super::ToolSpec;

/// A validation warning detected during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The configuration section (e.g. `tools.ripgrep`).
    pub source: String,
    /// The specific key or value that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Create a warning.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.source, self.item, self.message)
    }
}

/// Trait for configuration validators.
pub trait ConfigValidator {
    /// Validate the configuration and return any warnings found.
    fn validate(&self) -> Vec<ValidationWarning>;
}

/// Validator for one `[tools.<name>]` section.
#[derive(Debug)]
pub struct ToolSpecValidator<'a> {
    name: &'a str,
    spec: &'a ToolSpec,
}

impl<'a> ToolSpecValidator<'a> {
    /// Validate `spec`, reporting problems under `tools.<name>`.
    #[must_use]
    pub const fn new(name: &'a str, spec: &'a ToolSpec) -> Self {
        Self { name, spec }
    }
}

impl ConfigValidator for ToolSpecValidator<'_> {
    fn validate(&self) -> Vec<ValidationWarning> {
        let source = format!("tools.{}", self.name);
        let mut warnings = Vec::new();

        if self.spec.repo.trim().is_empty() {
            warnings.push(ValidationWarning::new(&source, "repo", "repository is empty"));
        }
        if self.spec.binaries.is_empty() {
            warnings.push(ValidationWarning::new(
                &source,
                "binaries",
                "no binaries listed; nothing would be installed",
            ));
        }
        for axis in self.spec.keyword_table().ignored_axes() {
            warnings.push(ValidationWarning::new(
                &source,
                format!("keywords.{axis}"),
                "unknown keyword axis, ignored",
            ));
        }
        for platform in &self.spec.platforms {
            if Os::from_name(platform) == Os::Other {
                warnings.push(ValidationWarning::new(
                    &source,
                    "platforms",
                    format!("unsupported platform '{platform}' (expected linux or darwin)"),
                ));
            }
        }
        warnings
    }
}
