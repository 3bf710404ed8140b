//! Log file location, ANSI stripping, and UTC timestamps.
use std::fs;
use std::path::PathBuf;

/// Remove CSI escape sequences (colours, cursor movement) from `s`.
///
/// A sequence runs from `ESC [` up to its final byte in `@`..=`~`.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if chars.next() == Some('[') {
            for inner in chars.by_ref() {
                if ('@'..='~').contains(&inner) {
                    break;
                }
            }
        }
    }
    out
}

/// `<cache>/envkit/<command>.log`, where `<cache>` is `$XDG_CACHE_HOME` or
/// `~/.cache`. Creates the directory; `None` if that fails.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let cache = std::env::var_os("XDG_CACHE_HOME").map_or_else(
        || {
            std::env::var_os("HOME")
                .or_else(|| std::env::var_os("USERPROFILE"))
                .map_or_else(|| PathBuf::from("."), PathBuf::from)
                .join(".cache")
        },
        PathBuf::from,
    );
    let dir = cache.join("envkit");
    fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// Current UTC time as `YYYY-MM-DD HH:MM:SS`, for the run header.
pub(super) fn format_utc_datetime() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Current UTC time as `HH:MM:SS`, for each log line.
pub(super) fn format_utc_time() -> String {
    chrono::Utc::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn strip_ansi_removes_summary_colours() {
        assert_eq!(strip_ansi("\x1b[32m✓ sccache\x1b[0m"), "✓ sccache");
        assert_eq!(
            strip_ansi("2 tools: \x1b[32m1 ok\x1b[0m, \x1b[31m1 failed\x1b[0m"),
            "2 tools: 1 ok, 1 failed"
        );
    }

    #[test]
    fn strip_ansi_drops_cursor_sequences_only() {
        assert_eq!(strip_ansi("\x1b[2K\x1b[1Gdownloading"), "downloading");
        assert_eq!(strip_ansi("v1.2.0 [linux]"), "v1.2.0 [linux]");
        assert_eq!(strip_ansi(""), "");
    }

    #[test]
    fn timestamps_have_fixed_width() {
        let time = format_utc_time();
        assert_eq!(time.len(), 8);
        assert_eq!(time.matches(':').count(), 2);
        let datetime = format_utc_datetime();
        assert_eq!(datetime.len(), 19);
        assert_eq!(datetime.matches('-').count(), 2);
        assert_eq!(&datetime[10..11], " ");
    }
}
