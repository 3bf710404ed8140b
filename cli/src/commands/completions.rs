//! Command: generate shell completions.
use std::io;

use clap::CommandFactory as _;
use clap_complete::Shell;

use crate::cli::Cli;

/// Write the completion script for `shell` to `out`.
pub fn write(shell: Shell, out: &mut dyn io::Write) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, out);
}

/// Print the completion script for `shell` to stdout.
pub fn run(shell: Shell) {
    write(shell, &mut io::stdout());
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn bash_script_mentions_subcommands() {
        let mut out = Vec::new();
        write(Shell::Bash, &mut out);
        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("envkit"));
        assert!(script.contains("download-github-release"));
        assert!(script.contains("uninstall"));
    }
}
