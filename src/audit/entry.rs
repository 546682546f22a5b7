use chrono::{Local, NaiveDateTime};
use std::fmt;
use std::path::{Path, PathBuf};

/// Timestamp layout of every log line: `[YYYY-MM-DD HH:MM:SS]`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A committed mutation, as recorded in the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditEvent {
    Appended {
        path: PathBuf,
        text: String,
        lines_after: usize,
    },
    Inserted {
        path: PathBuf,
        text: String,
        lineno: usize,
        lines_after: usize,
    },
    Deleted {
        path: PathBuf,
        lineno: usize,
        lines_after: usize,
    },
    Replaced {
        path: PathBuf,
        lineno: usize,
        text: String,
        lines_after: usize,
    },
    Substituted {
        path: PathBuf,
        key: String,
        sub: String,
        lines_after: usize,
    },
}

/// Path as written into a log line. A terminator inside a file name would
/// split the entry over two lines, so it is escaped as `\n`.
fn log_path(path: &Path) -> String {
    escape_terminators(&path.display().to_string())
}

fn escape_terminators(text: &str) -> String {
    text.replace('\n', "\\n")
}

// The file marker always comes first and literals are always double-quoted:
// `mentions_file` relies on both.
impl fmt::Display for EditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditEvent::Appended {
                path,
                text,
                lines_after,
            } => write!(
                f,
                "File '{}': Line \"{}\" appended | Lines After = {}",
                log_path(path),
                text,
                lines_after
            ),
            EditEvent::Inserted {
                path,
                text,
                lineno,
                lines_after,
            } => write!(
                f,
                "File '{}': Line \"{}\" inserted at Line {} | Lines After = {}",
                log_path(path),
                text,
                lineno,
                lines_after
            ),
            EditEvent::Deleted {
                path,
                lineno,
                lines_after,
            } => write!(
                f,
                "File '{}': Line {} deleted | Lines After = {}",
                log_path(path),
                lineno,
                lines_after
            ),
            EditEvent::Replaced {
                path,
                lineno,
                text,
                lines_after,
            } => write!(
                f,
                "File '{}': Line {} was replaced by \"{}\" | Lines After = {}",
                log_path(path),
                lineno,
                text,
                lines_after
            ),
            EditEvent::Substituted {
                path,
                key,
                sub,
                lines_after,
            } => write!(
                f,
                "File '{}': Instances of \"{}\" replaced by \"{}\" | Lines After = {}",
                log_path(path),
                key,
                sub,
                lines_after
            ),
        }
    }
}

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    timestamp: NaiveDateTime,
    description: String,
}

impl LogEntry {
    pub fn new(timestamp: NaiveDateTime, description: impl Into<String>) -> Self {
        Self {
            timestamp,
            description: description.into(),
        }
    }

    /// Entry stamped with the current local time.
    pub fn now(description: impl Into<String>) -> Self {
        Self::new(Local::now().naive_local(), description)
    }

    /// The entry as one log line of at most `max_len` bytes.
    ///
    /// Terminators are escaped and overlong lines are cut at a character
    /// boundary, so the log never fails its own line-safety check.
    pub fn to_log_line(&self, max_len: usize) -> String {
        let mut line = escape_terminators(&self.to_string());
        if line.len() > max_len {
            let mut end = max_len;
            while !line.is_char_boundary(end) {
                end -= 1;
            }
            line.truncate(end);
        }
        line
    }
}

impl From<&EditEvent> for LogEntry {
    fn from(event: &EditEvent) -> Self {
        LogEntry::now(event.to_string())
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.description
        )
    }
}

/// Whether a log line records an operation on `path`.
///
/// The `File '<path>'` marker must appear before the first double quote:
/// quoted literals may contain the same text without referring to the file.
pub fn mentions_file(line: &str, path: &str) -> bool {
    let marker = format!("File '{}'", escape_terminators(path));
    let Some(at) = line.find(&marker) else {
        return false;
    };
    match line.find('"') {
        Some(quote) => at < quote,
        None => true,
    }
}
