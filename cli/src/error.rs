//! Domain-specific error types for envkit.
//!
//! Internal modules return typed errors while command handlers at the CLI
//! boundary convert them to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! EnvkitError
//! ├── Config(ConfigError)    : config file reading, parsing, validation
//! ├── Release(ReleaseError)  : release resolution and asset download
//! ├── Exec(ExecError)        : shell commands
//! └── Tool(ToolError)        : tool recipe lookup and installation
//! ```
use std::path::PathBuf;

use thiserror::Error;

pub use crate::release::ReleaseError;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum EnvkitError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Release resolution or download error.
    #[error(transparent)]
    Release(#[from] ReleaseError),

    /// Shell command error.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// Tool recipe error.
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Errors that arise from loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config file {}: {source}", .path.display())]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for the settings schema.
    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        /// Path to the file.
        path: PathBuf,
        /// Underlying parse error.
        source: toml::de::Error,
    },

    /// A setting has an unusable value.
    #[error("invalid setting {key}: {reason}")]
    Invalid {
        /// Dotted key, e.g. `retry.timeout_secs`.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Errors from running shell commands.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The shell could not be started.
    #[error("failed to run '{command}': {source}")]
    Spawn {
        /// Command line.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The command exited unsuccessfully.
    #[error("'{command}' failed (exit {})", .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    Failed {
        /// Command line.
        command: String,
        /// Exit code; `None` when killed by a signal.
        code: Option<i32>,
    },
}

/// Errors from tool recipes.
#[derive(Error, Debug)]
pub enum ToolError {
    /// No recipe with this name or alias exists.
    #[error("unknown tool '{name}' (available: {available})")]
    Unknown {
        /// Requested name.
        name: String,
        /// Comma-separated known names.
        available: String,
    },

    /// The downloaded asset does not contain an expected binary.
    #[error("{tool}: binary '{binary}' not found in {}", .location.display())]
    MissingBinary {
        /// Tool name.
        tool: String,
        /// Binary name.
        binary: String,
        /// Directory that was searched.
        location: PathBuf,
    },

    /// A filesystem operation on the work directory failed.
    #[error("{tool}: cannot inspect {}: {source}", .location.display())]
    Io {
        /// Tool name.
        tool: String,
        /// Path involved.
        location: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
