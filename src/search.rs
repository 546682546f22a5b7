//! Read-only line searches.
//!
//! Both searches are line-buffered: the file must pass
//! [`verify_line_safety`](crate::scan::verify_line_safety) before any line is
//! read. Matching itself sits behind [`LineMatcher`], implemented for literal
//! byte strings and for case-insensitive regular expressions.

use crate::config::EditorConfig;
use crate::scan::{line_number_width, verify_line_safety, ScanError, LINE_TERMINATOR};
use regex::bytes::{Regex, RegexBuilder};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("failed to access {}: {source}", path.display())]
    FileAccess { path: PathBuf, source: io::Error },

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Decides how often a line matches.
pub trait LineMatcher {
    /// Number of matches in `line` (terminator excluded); 0 means no match.
    fn occurrences(&self, line: &[u8]) -> usize;
}

/// Literal byte-string matcher counting non-overlapping occurrences.
#[derive(Debug, Clone, Copy)]
pub struct Literal<'a>(&'a [u8]);

impl<'a> Literal<'a> {
    pub fn new(key: &'a str) -> Result<Self, SearchError> {
        if key.is_empty() {
            return Err(SearchError::InvalidPattern {
                pattern: String::new(),
                reason: "search key must not be empty".to_string(),
            });
        }
        Ok(Self(key.as_bytes()))
    }
}

impl LineMatcher for Literal<'_> {
    fn occurrences(&self, line: &[u8]) -> usize {
        count_occurrences(line, self.0)
    }
}

/// Regular expressions test a line once: a line matches or it does not.
impl LineMatcher for Regex {
    fn occurrences(&self, line: &[u8]) -> usize {
        usize::from(self.is_match(line))
    }
}

/// Compile `pattern` as a case-insensitive regular expression.
pub fn compile_pattern(pattern: &str) -> Result<Regex, SearchError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| SearchError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// Position of the first occurrence of `needle` in `haystack`.
pub fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Non-overlapping occurrences of `needle`, scanning left to right and
/// resuming after each match.
pub fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    let mut count = 0;
    let mut rest = haystack;
    while let Some(at) = find_bytes(rest, needle) {
        count += 1;
        rest = &rest[at + needle.len()..];
    }
    count
}

/// One line with at least one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineMatch {
    pub lineno: usize,
    pub occurrences: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    pub path: PathBuf,
    pub matches: Vec<LineMatch>,
    /// Occurrences for literal searches, matching lines for pattern searches
    pub total: usize,
    pub line_count: usize,
}

impl SearchReport {
    /// Column width for line numbers when printing this report.
    pub fn line_number_width(&self) -> usize {
        line_number_width(self.line_count)
    }
}

#[derive(Debug, Clone)]
pub struct SearchEngine {
    max_line_len: usize,
}

impl SearchEngine {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            max_line_len: config.max_line_len,
        }
    }

    /// Count non-overlapping occurrences of `key` on every line.
    pub fn search_literal(
        &self,
        path: impl AsRef<Path>,
        key: &str,
    ) -> Result<SearchReport, SearchError> {
        let matcher = Literal::new(key)?;
        self.search_with(path.as_ref(), &matcher)
    }

    /// Report every line matching `pattern`, case-insensitively.
    ///
    /// The pattern is compiled before the file is opened.
    pub fn search_pattern(
        &self,
        path: impl AsRef<Path>,
        pattern: &str,
    ) -> Result<SearchReport, SearchError> {
        let regex = compile_pattern(pattern)?;
        self.search_with(path.as_ref(), &regex)
    }

    pub fn search_with<M: LineMatcher + ?Sized>(
        &self,
        path: &Path,
        matcher: &M,
    ) -> Result<SearchReport, SearchError> {
        let access = |source: io::Error| SearchError::FileAccess {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = BufReader::new(File::open(path).map_err(access)?);
        let line_count = verify_line_safety(&mut reader, self.max_line_len)?;
        reader.seek(SeekFrom::Start(0)).map_err(access)?;

        let mut matches = Vec::new();
        let mut total = 0;
        let mut raw = Vec::with_capacity(self.max_line_len + 1);
        let mut lineno = 0;

        loop {
            raw.clear();
            if reader
                .read_until(LINE_TERMINATOR, &mut raw)
                .map_err(access)?
                == 0
            {
                break;
            }
            lineno += 1;

            let line = raw.strip_suffix(&[LINE_TERMINATOR]).unwrap_or(&raw[..]);
            // CRLF files: `$` and reported text end before the carriage return.
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            let occurrences = matcher.occurrences(line);
            if occurrences > 0 {
                total += occurrences;
                matches.push(LineMatch {
                    lineno,
                    occurrences,
                    text: String::from_utf8_lossy(line).into_owned(),
                });
            }
        }

        log::debug!(
            "searched {} lines of {}: {} hits",
            line_count,
            path.display(),
            total
        );

        Ok(SearchReport {
            path: path.to_path_buf(),
            matches,
            total,
            line_count,
        })
    }
}
