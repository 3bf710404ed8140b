//! Top-level subcommand orchestration.
pub mod completions;
pub mod download;
pub mod host;
pub mod install;
pub mod uninstall;
pub mod version;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::Settings;
use crate::exec::SystemExecutor;
use crate::logging::Logger;
use crate::platform::HostProfile;
use crate::release::ReleaseClient;
use crate::tools::{self, Action, Context};

/// Shared state produced by the common command setup sequence.
#[derive(Debug)]
pub struct CommandSetup {
    /// Detected host.
    pub host: HostProfile,
    /// Loaded user settings.
    pub settings: Settings,
}

impl CommandSetup {
    /// Detect the host and load the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read, parsed or
    /// validated.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let host = HostProfile::detect();
        log.info(&format!("host: {host}"));

        log.stage("Loading configuration");
        let settings =
            Settings::load(global.config.as_deref()).context("loading configuration")?;
        log.debug(&format!("api: {}", settings.github.api_url));
        log.debug(&format!("{} configured tool(s)", settings.tools.len()));

        let warnings = settings.warnings();
        if !warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                warnings.len()
            ));
            for warning in &warnings {
                log.warn(&format!("  {warning}"));
            }
        }

        Ok(Self { host, settings })
    }
}

/// Run `action` for every named tool, print the summary, and bail if any
/// tool failed.
///
/// Unknown names are rejected before anything is downloaded.
///
/// # Errors
///
/// Returns an error naming an unknown tool, or the number of failed tools.
pub fn run_tools_to_completion(
    names: &[String],
    action: Action,
    bin_dir: Option<&Path>,
    constraint: Option<&str>,
    global: &GlobalOpts,
    log: &Arc<Logger>,
) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let catalog = tools::catalog(&setup.settings);
    let selected = names
        .iter()
        .map(|name| tools::find(&catalog, name))
        .collect::<Result<Vec<_>, _>>()?;

    let releases = ReleaseClient::from_settings(&setup.settings, log.clone());
    let bin_dir = bin_dir.unwrap_or(&setup.settings.install.bin_dir);
    let ctx = Context {
        host: &setup.host,
        releases: &releases,
        executor: &SystemExecutor,
        log: log.as_ref(),
        bin_dir,
        constraint,
        dry_run: global.dry_run,
    };

    for tool in selected {
        tools::execute(tool, action, &ctx);
    }

    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} tool(s) failed");
    }
    Ok(())
}
