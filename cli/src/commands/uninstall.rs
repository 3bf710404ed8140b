//! Command: remove installed tools.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{GlobalOpts, UninstallOpts};
use crate::logging::Logger;
use crate::tools::Action;

/// Run the uninstall command.
///
/// # Errors
///
/// Returns an error if configuration loading fails, a tool is unknown, or
/// any tool fails to uninstall.
pub fn run(global: &GlobalOpts, opts: &UninstallOpts, log: &Arc<Logger>) -> Result<()> {
    super::run_tools_to_completion(
        &opts.tools,
        Action::Uninstall,
        opts.bin_dir.as_deref(),
        None,
        global,
        log,
    )
}
