//! Tracing subscriber setup: console formatter, file layer, and initialisation.
//!
//! Both outputs render the event message followed by any extra fields as
//! `key=value` pairs, so the fetcher's `url`, `attempt` and `wait_secs`
//! survive into the log file as separate tokens.
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing::field::{Field, Visit};

use super::utils::{format_utc_datetime, format_utc_time, log_file_path, strip_ansi};

/// Message and remaining fields of one [`tracing::Event`].
#[derive(Debug, Default)]
struct EventFields {
    message: String,
    extra: Vec<(&'static str, String)>,
}

impl EventFields {
    fn of(event: &tracing::Event<'_>) -> Self {
        let mut fields = Self::default();
        event.record(&mut fields);
        fields
    }

    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.extra.push((field.name(), value));
        }
    }

    /// Extra fields as ` key=value key=value`, empty when there are none.
    fn suffix(&self) -> String {
        self.extra.iter().fold(String::new(), |mut out, (k, v)| {
            let _ = write!(out, " {k}={v}");
            out
        })
    }
}

impl Visit for EventFields {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, value.to_string());
    }
}

/// Plain log-file line for an event, without the timestamp.
fn file_line(level: Level, target: &str, fields: &EventFields) -> String {
    let msg = strip_ansi(&fields.message);
    let extra = fields.suffix();
    match (level, target) {
        (Level::INFO, "envkit::stage") => format!("==> {msg}{extra}"),
        (Level::INFO, "envkit::dry_run") => format!("    [dry run] {msg}{extra}"),
        (Level::ERROR, _) => format!("    [error] {msg}{extra}"),
        (Level::WARN, _) => format!("    [warn] {msg}{extra}"),
        (Level::DEBUG | Level::TRACE, _) => format!("    [debug] {msg}{extra}"),
        _ => format!("    {msg}{extra}"),
    }
}

/// Coloured console line for an event; extra fields are dimmed.
fn console_line(level: Level, target: &str, fields: &EventFields) -> String {
    let msg = &fields.message;
    let extra = fields.suffix();
    let extra = if extra.is_empty() {
        extra
    } else {
        format!(" \x1b[2m{}\x1b[0m", extra.trim_start())
    };
    match level {
        Level::ERROR => format!("\x1b[31mERROR\x1b[0m {msg}{extra}"),
        Level::WARN => format!("\x1b[33mWARN\x1b[0m  {msg}{extra}"),
        Level::INFO if target == "envkit::stage" => {
            format!("\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m{extra}")
        }
        Level::INFO if target == "envkit::dry_run" => {
            format!("  \x1b[33m[DRY RUN]\x1b[0m {msg}{extra}")
        }
        Level::INFO => format!("  {msg}{extra}"),
        _ => format!("  \x1b[2m{msg}\x1b[0m{extra}"),
    }
}

/// A [`tracing_subscriber::Layer`] that appends all events to the persistent
/// log file with timestamps and ANSI codes stripped.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Open the log file for `command` under the cache directory.
    ///
    /// Returns `None` if the cache directory cannot be created or the file
    /// cannot be opened.
    pub(super) fn new(command: &str) -> Option<Self> {
        Self::at(&log_file_path(command)?)
    }

    /// Truncate `path`, write a run header, and return a layer appending to it.
    pub(super) fn at(path: &Path) -> Option<Self> {
        let version =
            option_env!("ENVKIT_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let header = format!(
            "==========================================\n\
             envkit {version} {}\n\
             ==========================================\n",
            format_utc_datetime(),
        );
        fs::write(path, header).ok()?;
        let file = fs::OpenOptions::new().append(true).open(path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();
        let line = file_line(*metadata.level(), metadata.target(), &EventFields::of(event));
        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "[{}] {line}", format_utc_time()).ok();
        }
    }
}

/// A [`tracing_subscriber::fmt::FormatEvent`] that emits envkit-style
/// console output.
struct ConsoleFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let line = console_line(*metadata.level(), metadata.target(), &EventFields::of(event));
        writeln!(writer, "{line}")
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// Console output goes to stdout (stage/info/debug) and stderr (warn/error);
/// the file layer records every event at `DEBUG` and above in
/// `$XDG_CACHE_HOME/envkit/<command>.log`. Must be called once at startup.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let make_writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));

    let console_layer = fmt::layer()
        .event_format(ConsoleFormatter)
        .with_writer(make_writer)
        .with_filter(console_level);

    let file_layer = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}
