//! Bounded, append-only audit log of committed mutations.
//!
//! Each entry is one line, `[YYYY-MM-DD HH:MM:SS] <description>`. After every
//! append the log is trimmed: once it holds more than `log_capacity` entries,
//! the oldest are dropped until `log_capacity - 10` remain, so trimming does
//! not happen on almost every append.
//!
//! Entries are never edited in place. Trimming goes through the same
//! [`AtomicRewriter`] as file edits and shares its scratch file.
//!
//! The log is shared by every invocation on the machine and is not locked;
//! concurrent invocations may interleave or lose entries.

mod entry;
mod errors;

pub use entry::{mentions_file, EditEvent, LogEntry, TIMESTAMP_FORMAT};
pub use errors::LogError;

use crate::config::{EditorConfig, MIN_LOG_CAPACITY};
use crate::rewrite::{AtomicRewriter, LineAction};
use crate::scan::{verify_line_safety, LINE_TERMINATOR};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
    scratch: PathBuf,
    capacity: usize,
    max_line_len: usize,
}

impl AuditLog {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            path: config.log_path.clone(),
            scratch: config.scratch_path.clone(),
            capacity: config.log_capacity.max(MIN_LOG_CAPACITY),
            max_line_len: config.max_log_line_len,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record a committed mutation, stamped with the current local time.
    pub fn record(&self, event: &EditEvent) -> Result<usize, LogError> {
        self.append(&LogEntry::from(event))
    }

    /// Append `entry` (creating the log if needed), then enforce retention.
    ///
    /// The entry is cut to `max_log_line_len` bytes, so an entry this log
    /// wrote itself never trips the tamper check.
    ///
    /// Returns the number of entries retained.
    pub fn append(&self, entry: &LogEntry) -> Result<usize, LogError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.access_error(source))?;
        writeln!(file, "{}", entry.to_log_line(self.max_line_len))
            .map_err(|source| self.access_error(source))?;
        drop(file);

        self.enforce_retention()
    }

    /// Trim the log to `capacity - 10` entries once it exceeds `capacity`.
    ///
    /// A log that fails its own line-safety check is left untouched and
    /// reported as [`LogError::LogTampered`].
    pub fn enforce_retention(&self) -> Result<usize, LogError> {
        let (_, count) = self.open_verified()?;
        if count <= self.capacity {
            return Ok(count);
        }

        let keep = self.capacity - MIN_LOG_CAPACITY;
        let excess = count - keep;
        AtomicRewriter::new(&self.path, &self.scratch).rewrite_lines(|lineno| {
            if lineno <= excess {
                LineAction::Drop
            } else {
                LineAction::Keep
            }
        })?;

        log::info!(
            "audit log {} trimmed from {} to {} entries",
            self.path.display(),
            count,
            keep
        );
        Ok(keep)
    }

    /// Log lines in append order, optionally only those recording operations
    /// on `filter`.
    pub fn entries(&self, filter: Option<&str>) -> Result<Vec<String>, LogError> {
        let mut entries = Vec::new();
        self.for_each_entry(filter, |line| {
            entries.push(line.to_string());
            Ok(())
        })?;
        Ok(entries)
    }

    /// Write matching log lines to `out`. Returns how many were written.
    pub fn display<W: Write>(&self, filter: Option<&str>, out: &mut W) -> Result<usize, LogError> {
        let mut shown = 0;
        self.for_each_entry(filter, |line| {
            writeln!(out, "{line}")?;
            shown += 1;
            Ok(())
        })?;
        Ok(shown)
    }

    fn for_each_entry<F>(&self, filter: Option<&str>, mut visit: F) -> Result<(), LogError>
    where
        F: FnMut(&str) -> io::Result<()>,
    {
        if !self.path.exists() {
            return Err(LogError::LogMissing {
                path: self.path.clone(),
            });
        }

        let (mut reader, _) = self.open_verified()?;
        reader
            .seek(SeekFrom::Start(0))
            .map_err(|source| self.access_error(source))?;

        let mut raw = Vec::with_capacity(self.max_line_len + 1);
        loop {
            raw.clear();
            let read = reader
                .read_until(LINE_TERMINATOR, &mut raw)
                .map_err(|source| self.access_error(source))?;
            if read == 0 {
                break;
            }
            if raw.last() == Some(&LINE_TERMINATOR) {
                raw.pop();
            }

            let line = String::from_utf8_lossy(&raw);
            let wanted = match filter {
                Some(path) => mentions_file(&line, path),
                None => true,
            };
            if wanted {
                visit(&line).map_err(|source| self.access_error(source))?;
            }
        }

        Ok(())
    }

    /// Open the log and verify it is safe for line-buffered reads.
    fn open_verified(&self) -> Result<(BufReader<File>, usize), LogError> {
        let file = File::open(&self.path).map_err(|source| self.access_error(source))?;
        let mut reader = BufReader::new(file);

        match verify_line_safety(&mut reader, self.max_line_len) {
            Ok(count) => Ok((reader, count)),
            Err(reason) => {
                log::warn!(
                    "audit log {} failed its safety check: {}",
                    self.path.display(),
                    reason
                );
                Err(LogError::LogTampered {
                    path: self.path.clone(),
                    reason,
                })
            }
        }
    }

    fn access_error(&self, source: io::Error) -> LogError {
        LogError::FileAccess {
            path: self.path.clone(),
            source,
        }
    }
}
