//! Version constraints evaluated against release tags.
use std::fmt;

use semver::{Version, VersionReq};

use super::error::ReleaseError;

const OPERATOR_CHARS: &str = "<>=~^!";

/// A parsed version constraint: one or more `||` alternatives, each a
/// conjunction of semver comparators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    raw: String,
    alternatives: Vec<Alternative>,
}

/// One `||` branch: a semver requirement minus the versions excluded with
/// `!=` / `<>`, which semver itself cannot express.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Alternative {
    req: VersionReq,
    excluded: Vec<Version>,
}

impl Alternative {
    fn matches(&self, version: &Version) -> bool {
        self.req.matches(version) && !self.excluded.contains(version)
    }
}

impl VersionConstraint {
    /// Parse a constraint; an empty or blank string means "latest" and
    /// yields `None`.
    ///
    /// Besides plain semver requirements (`>=1.4.0`, `^1.2`, `~1.2`, `1.*`,
    /// `1.2.x`) this accepts space-separated conjunctions (`>= 1.2 < 2`),
    /// hyphen ranges (`1.0 - 2.0`), `||` alternatives, `==` for equality,
    /// `!=` / `<>` for exclusion, and a `v` prefix on versions.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::InvalidConstraint`] if any alternative is not a
    /// valid requirement.
    pub fn parse(raw: &str) -> Result<Option<Self>, ReleaseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let alternatives = trimmed
            .split("||")
            .map(parse_alternative)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| ReleaseError::InvalidConstraint {
                constraint: trimmed.to_string(),
                reason,
            })?;
        Ok(Some(Self {
            raw: trimmed.to_string(),
            alternatives,
        }))
    }

    /// The constraint as written by the user.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `version` satisfies any alternative.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|alt| alt.matches(version))
    }

    /// Whether the version parsed from `tag` satisfies the constraint.
    /// Tags that do not parse never match.
    #[must_use]
    pub fn matches_tag(&self, tag: &str) -> bool {
        parse_tag(tag).is_some_and(|version| self.matches(&version))
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn parse_alternative(alternative: &str) -> Result<Alternative, String> {
    let alternative = alternative.trim();
    if alternative.is_empty() {
        return Err("empty alternative".to_string());
    }
    let (normalized, excluded) = match alternative.split_once(" - ") {
        Some((low, high)) => (
            format!(">={}, <={}", strip_v(low.trim()), strip_v(high.trim())),
            Vec::new(),
        ),
        None => join_comparators(alternative)?,
    };
    let req = if normalized.is_empty() {
        VersionReq::STAR
    } else {
        VersionReq::parse(&normalized).map_err(|e| e.to_string())?
    };
    Ok(Alternative { req, excluded })
}

/// Rewrite whitespace/comma separated comparators into semver's
/// comma-separated form, attaching detached operators (`>= 1.2`) to the
/// version that follows.
///
/// `==` becomes semver's `=`; `!=` and `<>` are pulled out as excluded
/// versions.
fn join_comparators(alternative: &str) -> Result<(String, Vec<Version>), String> {
    let mut comparators = Vec::new();
    let mut excluded = Vec::new();
    let mut pending = String::new();
    for token in alternative
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        if token.chars().all(|c| OPERATOR_CHARS.contains(c)) {
            pending.push_str(token);
            continue;
        }
        let split = token
            .find(|c: char| !OPERATOR_CHARS.contains(c))
            .unwrap_or(token.len());
        let (op, version) = token.split_at(split);
        let op = format!("{pending}{op}");
        pending.clear();
        match op.as_str() {
            "!=" | "<>" => {
                let version = parse_tag(strip_v(version))
                    .ok_or_else(|| format!("invalid version '{version}' after {op}"))?;
                excluded.push(version);
            }
            "==" => comparators.push(format!("={}", strip_v(version))),
            _ => comparators.push(format!("{op}{}", strip_v(version))),
        }
    }
    if !pending.is_empty() {
        return Err(format!("operator '{pending}' has no version"));
    }
    Ok((comparators.join(", "), excluded))
}

fn strip_v(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}

/// Leniently parse a release tag into a [`Version`].
///
/// Any prefix before the first digit is dropped (`v1.2.3`, `fish-3.7.1`,
/// `release-2.0.0`) and missing minor/patch components are padded with
/// zeros (`v1.4` becomes `1.4.0`). Returns `None` for anything else.
///
/// ```
/// use envkit_cli::release::version::parse_tag;
///
/// assert_eq!(parse_tag("v1.4").map(|v| v.to_string()), Some("1.4.0".to_string()));
/// assert_eq!(parse_tag("nightly"), None);
/// ```
#[must_use]
pub fn parse_tag(tag: &str) -> Option<Version> {
    let start = tag.find(|c: char| c.is_ascii_digit())?;
    let candidate = tag.get(start..)?;
    if let Ok(version) = Version::parse(candidate) {
        return Some(version);
    }

    let split = candidate.find(['-', '+']).unwrap_or(candidate.len());
    let (core, suffix) = candidate.split_at(split);
    let mut parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    parts.resize(3, "0");
    Version::parse(&format!("{}{suffix}", parts.join("."))).ok()
}
