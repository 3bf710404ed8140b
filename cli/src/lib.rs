//! Personal environment bootstrap built on a release acquisition engine.
//!
//! Developer tools are installed from prebuilt release binaries: a repository
//! reference and an optional version constraint resolve to one release, a
//! keyword table collapsed for the detected host picks its asset, and a
//! rate-limit-aware fetcher downloads it.
//!
//! The public API is organised into layers:
//!
//! - **[`platform`]**: detect OS, architecture and distribution family
//! - **[`release`]**: resolve releases, select assets and download them
//! - **[`tools`]**: release-backed tool recipes with install and uninstall
//! - **[`config`]**: load and validate `config.toml`
//! - **[`commands`]**: top-level subcommand orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod platform;
pub mod release;
pub mod tools;
