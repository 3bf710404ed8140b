//! `envkit` command-line entry point.
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use envkit_cli::cli::{Cli, Command};
use envkit_cli::commands;
use envkit_cli::logging::{self, Logger};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();

    match args.command {
        Command::Version => {
            commands::version::run();
            Ok(())
        }
        Command::Completions(opts) => {
            commands::completions::run(opts.shell);
            Ok(())
        }
        Command::Host => {
            commands::host::run();
            Ok(())
        }
        command => {
            logging::init_subscriber(args.verbose, command.log_name());
            let log = Arc::new(Logger::new(command.log_name()));
            match command {
                Command::DownloadGithubRelease(opts) => {
                    commands::download::run(&args.global, &opts, &log)
                }
                Command::Install(opts) => commands::install::run(&args.global, &opts, &log),
                Command::Uninstall(opts) => commands::uninstall::run(&args.global, &opts, &log),
                Command::Version | Command::Completions(_) | Command::Host => Ok(()),
            }
        }
    }
}
