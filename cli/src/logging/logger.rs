//! Structured logger with dry-run awareness and summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::{Log, RetryNotice, ToolEntry, ToolStatus};
use super::utils::log_file_path;

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with dry-run awareness and summary collection.
///
/// Every message is emitted as a [`tracing`] event; the subscriber installed
/// by [`init_subscriber`](super::subscriber::init_subscriber) renders it on
/// the console and appends it to `$XDG_CACHE_HOME/envkit/<command>.log`.
#[derive(Debug)]
pub struct Logger {
    tools: Mutex<Vec<ToolEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger for `command`.
    ///
    /// Only remembers the log file path for the run summary; the file itself
    /// is written by the subscriber's file layer.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self::with_log_file(log_file_path(command))
    }

    /// Create a logger that reports `log_file` in its summary.
    #[must_use]
    pub const fn with_log_file(log_file: Option<PathBuf>) -> Self {
        Self {
            tools: Mutex::new(Vec::new()),
            log_file,
        }
    }

    /// Return the log file path, if available.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded tool outcomes.
    #[must_use]
    pub fn tool_entries(&self) -> Vec<ToolEntry> {
        self.tools.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: "envkit::stage", "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: "envkit::dry_run", "{msg}");
    }

    /// Record a tool outcome for the summary.
    pub fn record_tool(&self, name: &str, status: ToolStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.tools.lock() {
            guard.push(ToolEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Count the failed tool actions.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.tools.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|t| t.status == ToolStatus::Failed)
                .count()
        })
    }

    /// Print one line per recorded tool and the totals.
    pub fn print_summary(&self) {
        let tools = match self.tools.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };
        if tools.is_empty() {
            return;
        }

        println!();
        self.stage("Summary");

        let mut ok = 0u32;
        let mut not_applicable = 0u32;
        let mut skipped = 0u32;
        let mut dry_run = 0u32;
        let mut failed = 0u32;

        for tool in &tools {
            let (icon, color) = match tool.status {
                ToolStatus::Ok => {
                    ok += 1;
                    ("✓", "\x1b[32m")
                }
                ToolStatus::NotApplicable => {
                    not_applicable += 1;
                    ("·", "\x1b[2m")
                }
                ToolStatus::Skipped => {
                    skipped += 1;
                    ("○", "\x1b[33m")
                }
                ToolStatus::DryRun => {
                    dry_run += 1;
                    ("~", "\x1b[37m")
                }
                ToolStatus::Failed => {
                    failed += 1;
                    ("✗", "\x1b[31m")
                }
            };

            let suffix = tool
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", tool.name));
        }

        println!();
        let total = ok + not_applicable + skipped + dry_run + failed;
        self.info(&format!(
            "{total} tools: \x1b[32m{ok} ok\x1b[0m, \x1b[2m{not_applicable} n/a\x1b[0m, \x1b[33m{skipped} skipped\x1b[0m, \x1b[37m{dry_run} dry-run\x1b[0m, \x1b[31m{failed} failed\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record_tool(&self, name: &str, status: ToolStatus, message: Option<&str>) {
        self.record_tool(name, status, message);
    }

    fn retry(&self, notice: &RetryNotice<'_>) {
        tracing::warn!(
            target: "envkit::fetch",
            url = notice.url,
            attempt = notice.attempt,
            wait_secs = notice.wait_secs,
            kind = notice.kind.as_str(),
            "{notice}"
        );
    }
}
