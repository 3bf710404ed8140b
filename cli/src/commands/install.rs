//! Command: install release-backed tools.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{GlobalOpts, InstallOpts};
use crate::logging::Logger;
use crate::tools::Action;

/// Run the install command.
///
/// # Errors
///
/// Returns an error if configuration loading fails, a tool is unknown, or
/// any tool fails to install.
pub fn run(global: &GlobalOpts, opts: &InstallOpts, log: &Arc<Logger>) -> Result<()> {
    super::run_tools_to_completion(
        &opts.tools,
        Action::Install,
        opts.bin_dir.as_deref(),
        opts.constraint.as_deref(),
        global,
        log,
    )
}
