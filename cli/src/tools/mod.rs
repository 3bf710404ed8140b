//! Release-backed tool recipes and their install/uninstall driver.
//!
//! A [`Tool`] names a repository, the keyword table selecting its asset, how
//! the asset is packaged and which binaries it provides. Built-in recipes
//! live in [`recipes`]; `[tools.<name>]` config sections add or replace
//! recipes by name.
pub mod install;
pub mod recipes;

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::config::{Settings, ToolSpec};
use crate::error::{EnvkitError, ToolError};
use crate::exec::Executor;
use crate::logging::{Log, ToolStatus};
use crate::platform::{HostProfile, Os};
use crate::release::keywords::KeywordTable;
use crate::release::{ReleaseClient, ReleaseRequest};

/// How a release asset is packaged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Archive {
    /// Gzip-compressed tarball (`.tar.gz`, `.tgz`).
    #[default]
    #[serde(rename = "tar.gz", alias = "tgz")]
    TarGz,
    /// XZ-compressed tarball.
    #[serde(rename = "tar.xz")]
    TarXz,
    /// The asset is the executable itself.
    #[serde(rename = "binary")]
    Binary,
}

impl fmt::Display for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TarGz => write!(f, "tar.gz"),
            Self::TarXz => write!(f, "tar.xz"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// A tool installed from a release asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    /// Canonical name.
    pub name: String,
    /// Alternative names accepted on the command line.
    pub aliases: Vec<String>,
    /// Repository reference.
    pub repo: String,
    /// Required keywords per axis.
    pub keywords: KeywordTable,
    /// Keywords the asset name must not contain.
    pub exclude: Vec<String>,
    /// Packaging of the asset.
    pub archive: Archive,
    /// Executables installed into the bin directory.
    pub binaries: Vec<String>,
    /// Operating systems the recipe supports.
    pub platforms: Vec<Os>,
}

impl Tool {
    /// Build a tool from a config-defined recipe.
    #[must_use]
    pub fn from_spec(name: &str, spec: &ToolSpec) -> Self {
        Self {
            name: name.to_string(),
            aliases: vec![],
            repo: spec.repo.clone(),
            keywords: spec.keyword_table(),
            exclude: spec.exclude.clone(),
            archive: spec.archive,
            binaries: spec.binaries.clone(),
            platforms: spec
                .platforms
                .iter()
                .map(|p| Os::from_name(p))
                .filter(|os| *os != Os::Other)
                .collect(),
        }
    }

    /// Whether `name` is this tool's name or one of its aliases.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }

    /// Whether the recipe applies to `host`.
    #[must_use]
    pub fn supports(&self, host: &HostProfile) -> bool {
        self.platforms.contains(&host.os)
    }

    /// Release request downloading this tool's asset into a temp dir.
    #[must_use]
    pub fn request(&self, constraint: Option<&str>) -> ReleaseRequest {
        ReleaseRequest {
            repo: self.repo.clone(),
            constraint: constraint.map(str::to_string),
            keywords: self.keywords.clone(),
            exclude: self.exclude.clone(),
            output: None,
            use_temp_dir: true,
        }
    }
}

/// Built-in recipes merged with the config-defined ones; a config recipe
/// replaces a built-in of the same name.
#[must_use]
pub fn catalog(settings: &Settings) -> Vec<Tool> {
    let mut tools: Vec<Tool> = recipes::builtin()
        .into_iter()
        .filter(|tool| !settings.tools.contains_key(&tool.name))
        .collect();
    tools.extend(
        settings
            .tools
            .iter()
            .map(|(name, spec)| Tool::from_spec(name, spec)),
    );
    tools
}

/// Look up `name` (or an alias) in `catalog`.
///
/// # Errors
///
/// Returns [`ToolError::Unknown`] listing the available names.
pub fn find<'a>(catalog: &'a [Tool], name: &str) -> Result<&'a Tool, ToolError> {
    catalog
        .iter()
        .find(|tool| tool.is_named(name))
        .ok_or_else(|| ToolError::Unknown {
            name: name.to_string(),
            available: catalog
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// Outcome of a successful tool action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    /// Changes were applied.
    Ok,
    /// Nothing to do, with the reason.
    Skipped(String),
    /// Dry run; the planned commands were logged.
    DryRun,
}

/// What to do with a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Download and install.
    Install,
    /// Remove installed binaries.
    Uninstall,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "Installing"),
            Self::Uninstall => write!(f, "Uninstalling"),
        }
    }
}

/// Shared state for tool actions.
#[derive(Debug)]
pub struct Context<'a> {
    /// Host the tools are installed on.
    pub host: &'a HostProfile,
    /// Release engine used to download assets.
    pub releases: &'a ReleaseClient,
    /// Shell command runner.
    pub executor: &'a dyn Executor,
    /// Logger.
    pub log: &'a dyn Log,
    /// Directory receiving the binaries.
    pub bin_dir: &'a Path,
    /// Version constraint applied to every tool; `None` means latest.
    pub constraint: Option<&'a str>,
    /// Log planned commands instead of running them.
    pub dry_run: bool,
}

/// Run `action` for `tool`, recording the result for the summary.
pub fn execute(tool: &Tool, action: Action, ctx: &Context<'_>) {
    if !tool.supports(ctx.host) {
        ctx.log.debug(&format!(
            "skipping {}: not supported on {}",
            tool.name, ctx.host
        ));
        ctx.log
            .record_tool(&tool.name, ToolStatus::NotApplicable, None);
        return;
    }

    ctx.log.stage(&format!("{action} {}", tool.name));

    let result: Result<ToolResult, EnvkitError> = match action {
        Action::Install => install::install(tool, ctx),
        Action::Uninstall => install::uninstall(tool, ctx),
    };
    match result {
        Ok(ToolResult::Ok) => ctx.log.record_tool(&tool.name, ToolStatus::Ok, None),
        Ok(ToolResult::Skipped(reason)) => {
            ctx.log.info(&format!("skipped: {reason}"));
            ctx.log
                .record_tool(&tool.name, ToolStatus::Skipped, Some(&reason));
        }
        Ok(ToolResult::DryRun) => ctx.log.record_tool(&tool.name, ToolStatus::DryRun, None),
        Err(e) => {
            ctx.log.error(&format!("{}: {e}", tool.name));
            ctx.log
                .record_tool(&tool.name, ToolStatus::Failed, Some(&e.to_string()));
        }
    }
}
