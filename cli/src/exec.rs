//! Shell command execution and privilege selection.
use std::path::Path;
use std::process::Command;

use crate::error::ExecError;

/// Runs shell commands.
///
/// Tool recipes only see this trait, so tests can record commands instead of
/// running them.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run `command` through `bash -c` with inherited stdio and `env` added
    /// to the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Spawn`] if bash cannot be started and
    /// [`ExecError::Failed`] on a non-zero exit.
    fn run_shell(&self, command: &str, env: &[(&str, &str)]) -> Result<(), ExecError>;

    /// Whether `program` is available on `PATH`.
    fn which(&self, program: &str) -> bool;
}

/// Executor running real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run_shell(&self, command: &str, env: &[(&str, &str)]) -> Result<(), ExecError> {
        let status = Command::new("bash")
            .arg("-c")
            .arg(command)
            .envs(env.iter().copied())
            .status()
            .map_err(|source| ExecError::Spawn {
                command: command.to_string(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(ExecError::Failed {
                command: command.to_string(),
                code: status.code(),
            })
        }
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Quote `arg` for safe interpolation into a `bash -c` command line.
///
/// ```
/// use envkit_cli::exec::shell_quote;
///
/// assert_eq!(shell_quote("/usr/local/bin"), "/usr/local/bin");
/// assert_eq!(shell_quote("it's here"), "'it'\\''s here'");
/// ```
#[must_use]
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+@%,".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Whether the current user can create files in `dir`, or, if `dir` does not
/// exist yet, in its nearest existing ancestor.
#[must_use]
pub fn is_writable(dir: &Path) -> bool {
    let Some(existing) = dir.ancestors().find(|p| p.is_dir()) else {
        return false;
    };
    tempfile::Builder::new()
        .prefix(".envkit-write-check-")
        .tempfile_in(existing)
        .is_ok()
}

/// Command prefix needed to write into `dir`: empty when writable, `sudo `
/// when not writable and `sudo` is available.
#[must_use]
pub fn privilege_prefix(dir: &Path, executor: &dyn Executor) -> &'static str {
    if is_writable(dir) || !executor.which("sudo") {
        ""
    } else {
        "sudo "
    }
}
