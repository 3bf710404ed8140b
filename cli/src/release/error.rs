//! Error types for release resolution and asset retrieval.
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use super::http::RateLimit;

/// Fatal outcomes of resolving a release or fetching an asset.
///
/// Rate-limit waits and transient failures that are later recovered from
/// are not errors; they are logged as warnings by the fetcher.
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// The request still failed once the retry budget was spent.
    #[error("request to {url} failed after {attempts} attempt(s): {last}")]
    Http {
        /// Requested URL.
        url: String,
        /// Number of attempts made, rate-limit waits excluded.
        attempts: u32,
        /// The failure observed on the final attempt.
        last: Failure,
    },

    /// No release tag satisfies the requested constraint.
    #[error("no release of {repo} satisfies version constraint '{constraint}'")]
    NoMatchingRelease {
        /// Repository, as displayed to the user.
        repo: String,
        /// The constraint that nothing matched.
        constraint: String,
    },

    /// No asset of the resolved release matches the keyword profile.
    #[error(
        "no asset of release {tag} contains all of {required:?} while avoiding {excluded:?}"
    )]
    NoMatchingAsset {
        /// Tag of the resolved release.
        tag: String,
        /// Keywords every candidate had to contain.
        required: Vec<String>,
        /// Keywords no candidate could contain.
        excluded: Vec<String>,
    },

    /// The version constraint could not be parsed.
    #[error("invalid version constraint '{constraint}': {reason}")]
    InvalidConstraint {
        /// The constraint as supplied.
        constraint: String,
        /// Parser message.
        reason: String,
    },

    /// The URL to fetch is malformed; nothing was requested.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL as supplied.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// A successful response carried a payload that is not the expected JSON.
    #[error("malformed response from {url}: {source}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// The destination file could not be created or written.
    #[error("cannot write {}: {source}", .path.display())]
    DestinationWrite {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The rate limit was still exhausted after the maximum number of waits.
    #[error("rate limit for {url} still exhausted after {waits} wait(s)")]
    RateLimitWaitsExceeded {
        /// Requested URL.
        url: String,
        /// Number of waits performed.
        waits: u32,
    },
}

/// The failure observed on one request attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The server answered with a non-success status.
    Status {
        /// HTTP status code.
        code: u16,
        /// Rate-limit headers of the response, if any.
        rate_limit: RateLimit,
    },
    /// The connection could not be established or broke before a response.
    Transport(String),
    /// The response body could not be read to the end.
    Body(String),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { code, rate_limit } if rate_limit.is_empty() => {
                write!(f, "HTTP status {code}")
            }
            Self::Status { code, rate_limit } => write!(f, "HTTP status {code} ({rate_limit})"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Body(msg) => write!(f, "body read error: {msg}"),
        }
    }
}
