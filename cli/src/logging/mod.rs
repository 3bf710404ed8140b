//! Logging infrastructure for structured console and file output.

mod logger;
mod subscriber;
mod types;
mod utils;

pub use logger::Logger;
pub use subscriber::init_subscriber;
pub use types::{Log, RetryKind, RetryNotice, ToolEntry, ToolStatus};

/// Create a [`Logger`] backed by an isolated per-thread tracing subscriber
/// whose file layer writes into a fresh temporary directory.
///
/// Keep the returned guard alive for the duration of the test; dropping it
/// restores the previous thread-local dispatcher.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let path = tmp.path().join("test.log");
    let file_layer = subscriber::FileLayer::at(&path).expect("failed to create file layer");
    let log = Logger::with_log_file(Some(path));
    let subscriber =
        tracing_subscriber::registry().with(file_layer.with_filter(LevelFilter::DEBUG));
    let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(subscriber));
    (log, tmp, guard)
}

/// In-memory [`Log`] implementation for unit tests.
#[cfg(test)]
pub(crate) mod test_helpers {
    use std::sync::Mutex;

    use super::{Log, ToolEntry, ToolStatus};

    /// Captures every message as `(level, message)` and every recorded tool.
    #[derive(Debug, Default)]
    pub struct CapturingLog {
        messages: Mutex<Vec<(&'static str, String)>>,
        tools: Mutex<Vec<ToolEntry>>,
    }

    impl CapturingLog {
        fn push(&self, level: &'static str, msg: &str) {
            if let Ok(mut guard) = self.messages.lock() {
                guard.push((level, msg.to_string()));
            }
        }

        /// All messages logged at `level`.
        pub fn at(&self, level: &str) -> Vec<String> {
            self.messages.lock().map_or_else(
                |_| vec![],
                |guard| {
                    guard
                        .iter()
                        .filter(|(l, _)| *l == level)
                        .map(|(_, m)| m.clone())
                        .collect()
                },
            )
        }

        /// Whether any message at any level contains `needle`.
        pub fn contains(&self, needle: &str) -> bool {
            self.messages
                .lock()
                .is_ok_and(|guard| guard.iter().any(|(_, m)| m.contains(needle)))
        }

        /// Recorded tool outcomes.
        pub fn tools(&self) -> Vec<ToolEntry> {
            self.tools.lock().map_or_else(|_| vec![], |g| g.clone())
        }
    }

    impl Log for CapturingLog {
        fn stage(&self, msg: &str) {
            self.push("stage", msg);
        }
        fn info(&self, msg: &str) {
            self.push("info", msg);
        }
        fn debug(&self, msg: &str) {
            self.push("debug", msg);
        }
        fn warn(&self, msg: &str) {
            self.push("warn", msg);
        }
        fn error(&self, msg: &str) {
            self.push("error", msg);
        }
        fn dry_run(&self, msg: &str) {
            self.push("dry_run", msg);
        }
        fn record_tool(&self, name: &str, status: ToolStatus, message: Option<&str>) {
            if let Ok(mut guard) = self.tools.lock() {
                guard.push(ToolEntry {
                    name: name.to_string(),
                    status,
                    message: message.map(String::from),
                });
            }
        }
    }
}
