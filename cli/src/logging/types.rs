//! The [`Log`] trait and the records it carries: per-tool outcomes for the
//! run summary and retry notices from the fetcher.
use std::fmt;

/// Outcome of one tool action, kept for the run summary.
#[derive(Debug, Clone)]
pub struct ToolEntry {
    /// Recipe name.
    pub name: String,
    /// How the action ended.
    pub status: ToolStatus,
    /// Skip reason or error text.
    pub message: Option<String>,
}

/// How a tool action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    /// Installed or removed.
    Ok,
    /// The recipe has no build for this host.
    NotApplicable,
    /// Nothing to do, e.g. removing a tool that is not installed.
    Skipped,
    /// Planned only.
    DryRun,
    /// The action failed.
    Failed,
}

/// Why the fetcher is about to sleep before repeating a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryKind {
    /// The rate limit is exhausted; the retry budget is untouched.
    RateLimit,
    /// A transient failure spent one retry.
    Failure,
}

impl RetryKind {
    /// Field value used in structured log output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::Failure => "failure",
        }
    }
}

/// A wait before the fetcher repeats a request.
///
/// Backends that understand structured fields log `url`, `attempt` and
/// `wait_secs` separately; the [`Display`](fmt::Display) form is the plain
/// sentence used everywhere else.
#[derive(Debug, Clone, Copy)]
pub struct RetryNotice<'a> {
    /// Request being repeated.
    pub url: &'a str,
    /// Rate-limit wait number or retry number, starting at 1.
    pub attempt: u32,
    /// Upper bound on `attempt` for this kind of wait.
    pub limit: u32,
    /// Seconds until the next request.
    pub wait_secs: u64,
    /// What triggers the wait.
    pub kind: RetryKind,
    /// Failure or rate-limit details.
    pub detail: &'a str,
}

impl fmt::Display for RetryNotice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RetryKind::RateLimit => write!(
                f,
                "rate limit exhausted for {} ({}); waiting {}s",
                self.url, self.detail, self.wait_secs
            ),
            RetryKind::Failure => write!(
                f,
                "{}: {}; retry {}/{} in {}s",
                self.url, self.detail, self.attempt, self.limit, self.wait_secs
            ),
        }
    }
}

/// Abstraction over logging backends.
///
/// [`Logger`](super::logger::Logger) is the production implementation; the
/// release engine and tool recipes only see this trait so tests can capture
/// messages without a global subscriber.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a tool outcome for the summary.
    fn record_tool(&self, name: &str, status: ToolStatus, message: Option<&str>);

    /// Log a fetcher wait. Defaults to a plain warning.
    fn retry(&self, notice: &RetryNotice<'_>) {
        self.warn(&notice.to_string());
    }
}

impl fmt::Debug for dyn Log + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Log")
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::test_helpers::CapturingLog;

    fn notice(kind: RetryKind) -> RetryNotice<'static> {
        RetryNotice {
            url: "https://api.github.com/repos/a/b/releases/latest",
            attempt: 2,
            limit: 3,
            wait_secs: 240,
            kind,
            detail: "HTTP 502",
        }
    }

    #[test]
    fn failure_notice_reads_as_retry_count() {
        assert_eq!(
            notice(RetryKind::Failure).to_string(),
            "https://api.github.com/repos/a/b/releases/latest: HTTP 502; retry 2/3 in 240s"
        );
    }

    #[test]
    fn rate_limit_notice_reads_as_wait() {
        let mut n = notice(RetryKind::RateLimit);
        n.detail = "remaining 0, resets at 1700000000";
        assert_eq!(
            n.to_string(),
            "rate limit exhausted for https://api.github.com/repos/a/b/releases/latest \
             (remaining 0, resets at 1700000000); waiting 240s"
        );
    }

    #[test]
    fn default_retry_is_a_warning() {
        let log = CapturingLog::default();
        log.retry(&notice(RetryKind::Failure));
        assert_eq!(log.at("warn").len(), 1);
        assert!(log.at("warn")[0].contains("retry 2/3"));
    }
}
