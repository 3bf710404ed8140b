//! Command-line interface definition.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::release::keywords::Axis;

/// Top-level CLI entry point.
#[derive(Parser, Debug)]
#[command(
    name = "envkit",
    about = "Personal environment bootstrap: install developer tools from release binaries",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Config file (default: $XDG_CONFIG_HOME/envkit/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download the release asset matching this host
    #[command(
        name = "download-github-release",
        visible_aliases = ["github-release", "from-github"]
    )]
    DownloadGithubRelease(DownloadOpts),
    /// Install tools from their release binaries
    Install(InstallOpts),
    /// Remove installed tools
    Uninstall(UninstallOpts),
    /// Show the detected host profile
    Host,
    /// Generate shell completions
    Completions(CompletionsOpts),
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the per-command log file.
    #[must_use]
    pub const fn log_name(&self) -> &'static str {
        match self {
            Self::DownloadGithubRelease(_) => "download-github-release",
            Self::Install(_) => "install",
            Self::Uninstall(_) => "uninstall",
            Self::Host => "host",
            Self::Completions(_) => "completions",
            Self::Version => "version",
        }
    }
}

/// Options for the `download-github-release` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct DownloadOpts {
    /// Repository: owner/repo, browse URL, SSH remote or releases API URL
    #[arg(short, long)]
    pub repo: String,

    /// Version constraint, e.g. ">=1.4" (default: latest release)
    #[arg(short, long)]
    pub constraint: Option<String>,

    /// Keyword every host requires in the asset name
    #[arg(short = 'k', long = "kwd", value_name = "KW")]
    pub kwd: Vec<String>,

    /// Keyword required on one axis (amd64, arm64, linux, darwin,
    /// DebianUbuntuSeries, FedoraSeries, OtherLinux)
    #[arg(long = "kwd-for", value_name = "AXIS=KW", value_parser = parse_axis_keyword)]
    pub kwd_for: Vec<(Axis, String)>,

    /// Keyword the asset name must not contain
    #[arg(short = 'K', long = "exclude", value_name = "KW")]
    pub exclude: Vec<String>,

    /// Destination file name
    #[arg(short, long)]
    pub output: String,

    /// Create the destination inside a fresh temporary directory
    #[arg(long)]
    pub temp_dir: bool,
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct InstallOpts {
    /// Tools to install
    #[arg(required = true, value_name = "TOOL")]
    pub tools: Vec<String>,

    /// Install binaries here instead of the configured bin dir
    #[arg(long, value_name = "DIR")]
    pub bin_dir: Option<PathBuf>,

    /// Version constraint applied to every tool (default: latest)
    #[arg(short, long)]
    pub constraint: Option<String>,
}

/// Options for the `uninstall` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct UninstallOpts {
    /// Tools to remove
    #[arg(required = true, value_name = "TOOL")]
    pub tools: Vec<String>,

    /// Remove binaries from here instead of the configured bin dir
    #[arg(long, value_name = "DIR")]
    pub bin_dir: Option<PathBuf>,
}

/// Options for the `completions` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CompletionsOpts {
    /// Target shell
    pub shell: clap_complete::Shell,
}

/// Parse `AXIS=KEYWORD`; axis names are checked strictly.
fn parse_axis_keyword(value: &str) -> Result<(Axis, String), String> {
    let (axis, keyword) = value
        .split_once('=')
        .ok_or_else(|| format!("expected AXIS=KEYWORD, got '{value}'"))?;
    let axis = axis.trim().parse::<Axis>().map_err(|e| e.to_string())?;
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(format!("empty keyword for axis {axis}"));
    }
    Ok((axis, keyword.to_string()))
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::unreachable
)]
mod tests {
    use super::*;
    use crate::platform::{Arch, DistroFamily, Os};
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_download_with_all_options() {
        let cli = Cli::parse_from([
            "envkit",
            "download-github-release",
            "-r",
            "mozilla/sccache",
            "-c",
            ">=0.8",
            "-k",
            "tar.gz",
            "--kwd-for",
            "amd64=x86_64",
            "--kwd-for",
            "FedoraSeries=musl",
            "-K",
            "sha256",
            "-o",
            "sccache.tar.gz",
            "--temp-dir",
        ]);
        let Command::DownloadGithubRelease(opts) = cli.command else {
            unreachable!("expected download-github-release");
        };
        assert_eq!(opts.repo, "mozilla/sccache");
        assert_eq!(opts.constraint.as_deref(), Some(">=0.8"));
        assert_eq!(opts.kwd, ["tar.gz"]);
        assert_eq!(
            opts.kwd_for,
            [
                (Axis::Arch(Arch::Amd64), "x86_64".to_string()),
                (Axis::Distro(DistroFamily::Fedora), "musl".to_string())
            ]
        );
        assert_eq!(opts.exclude, ["sha256"]);
        assert_eq!(opts.output, "sccache.tar.gz");
        assert!(opts.temp_dir);
    }

    #[test]
    fn download_aliases() {
        for alias in ["github-release", "from-github"] {
            let cli = Cli::parse_from(["envkit", alias, "-r", "a/b", "-o", "out"]);
            assert!(matches!(cli.command, Command::DownloadGithubRelease(_)));
        }
    }

    #[test]
    fn unknown_axis_is_rejected() {
        let result = Cli::try_parse_from([
            "envkit", "from-github", "-r", "a/b", "-o", "out", "--kwd-for", "x86=x",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn axis_keyword_parser() {
        assert_eq!(
            parse_axis_keyword("linux=gnu"),
            Ok((Axis::Os(Os::Linux), "gnu".to_string()))
        );
        assert!(parse_axis_keyword("linux").is_err());
        assert!(parse_axis_keyword("linux=").is_err());
        assert!(parse_axis_keyword("windows=msvc").is_err());
    }

    #[test]
    fn download_requires_repo_and_output() {
        assert!(Cli::try_parse_from(["envkit", "from-github", "-o", "out"]).is_err());
        assert!(Cli::try_parse_from(["envkit", "from-github", "-r", "a/b"]).is_err());
    }

    #[test]
    fn parse_install_with_globals() {
        let cli = Cli::parse_from([
            "envkit", "-v", "-d", "--config", "/tmp/c.toml", "install", "fish", "sccache",
            "--bin-dir", "/opt/bin", "-c", "^3",
        ]);
        assert!(cli.verbose);
        assert!(cli.global.dry_run);
        assert_eq!(cli.global.config, Some(PathBuf::from("/tmp/c.toml")));
        let Command::Install(opts) = cli.command else {
            unreachable!("expected install");
        };
        assert_eq!(opts.tools, ["fish", "sccache"]);
        assert_eq!(opts.bin_dir, Some(PathBuf::from("/opt/bin")));
        assert_eq!(opts.constraint.as_deref(), Some("^3"));
    }

    #[test]
    fn install_requires_a_tool() {
        assert!(Cli::try_parse_from(["envkit", "install"]).is_err());
        assert!(Cli::try_parse_from(["envkit", "uninstall"]).is_err());
    }

    #[test]
    fn parse_simple_commands() {
        assert!(matches!(Cli::parse_from(["envkit", "host"]).command, Command::Host));
        assert!(matches!(Cli::parse_from(["envkit", "version"]).command, Command::Version));
        assert!(matches!(
            Cli::parse_from(["envkit", "completions", "bash"]).command,
            Command::Completions(_)
        ));
    }

    #[test]
    fn log_names() {
        assert_eq!(Cli::parse_from(["envkit", "host"]).command.log_name(), "host");
        assert_eq!(
            Cli::parse_from(["envkit", "from-github", "-r", "a/b", "-o", "o"])
                .command
                .log_name(),
            "download-github-release"
        );
    }
}
