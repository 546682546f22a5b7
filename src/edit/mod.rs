//! Line-indexed file mutations.
//!
//! Every operation follows the same shape: check the target, count its
//! lines, validate the requested line number, rewrite through
//! [`AtomicRewriter`], and record the committed change in the [`AuditLog`].
//! Nothing is written before validation passes, so a rejected request
//! leaves the file untouched.
//!
//! Line numbers are 1-based. Delete and replace accept `1..=count`; insert
//! also accepts `count + 1`, meaning "after the last line".

mod errors;
mod substitute;

pub use errors::EditError;
pub use substitute::{LineSubstitution, SubstitutionReport};

use crate::audit::{AuditLog, EditEvent};
use crate::config::EditorConfig;
use crate::rewrite::{AtomicRewriter, LineAction};
use crate::safety::TargetGuard;
use crate::scan::{self, count_lines, verify_line_safety, LINE_TERMINATOR};
use crate::search::count_occurrences;
use substitute::substitute_line;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Result of a committed line edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOutcome {
    pub lines_before: usize,
    pub lines_after: usize,
}

#[derive(Debug, Clone)]
pub struct LineEditor {
    guard: TargetGuard,
    audit: AuditLog,
    scratch: PathBuf,
    max_line_len: usize,
}

impl LineEditor {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            guard: TargetGuard::new(config),
            audit: AuditLog::new(config),
            scratch: config.scratch_path.clone(),
            max_line_len: config.max_line_len,
        }
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Count the lines of `path`. Byte-wise, so any content is accepted.
    pub fn count_lines(&self, path: impl AsRef<Path>) -> Result<usize, EditError> {
        let path = path.as_ref();
        let mut reader = open_source(path)?;
        count_lines(&mut reader).map_err(|e| EditError::access(path, e))
    }

    /// Content of line `lineno`, without its terminator.
    pub fn show_line(&self, path: impl AsRef<Path>, lineno: usize) -> Result<Vec<u8>, EditError> {
        let path = path.as_ref();
        let mut reader = open_source(path)?;
        let lines = count_lines(&mut reader).map_err(|e| EditError::access(path, e))?;
        check_range(lineno, lines)?;

        rewind(path, &mut reader)?;
        scan::read_line(&mut reader, lineno)
            .map_err(|e| EditError::access(path, e))?
            .ok_or(EditError::LineOutOfRange {
                lineno,
                max: lines,
            })
    }

    /// Insert `text` as a new line `lineno`; the old line `lineno` moves down.
    pub fn insert_at(
        &self,
        path: impl AsRef<Path>,
        lineno: usize,
        text: &str,
    ) -> Result<EditOutcome, EditError> {
        let path = path.as_ref();
        self.check_text(text)?;

        let lines_before = self.rewrite_line(
            path,
            lineno,
            1,
            LineAction::InsertBefore(text.as_bytes().to_vec()),
        )?;
        let outcome = EditOutcome {
            lines_before,
            lines_after: lines_before + 1,
        };

        self.record(EditEvent::Inserted {
            path: path.to_path_buf(),
            text: text.to_string(),
            lineno,
            lines_after: outcome.lines_after,
        })?;
        Ok(outcome)
    }

    /// Remove line `lineno` together with its terminator.
    pub fn delete_at(&self, path: impl AsRef<Path>, lineno: usize) -> Result<EditOutcome, EditError> {
        let path = path.as_ref();

        let lines_before = self.rewrite_line(path, lineno, 0, LineAction::Drop)?;
        let outcome = EditOutcome {
            lines_before,
            lines_after: lines_before - 1,
        };

        self.record(EditEvent::Deleted {
            path: path.to_path_buf(),
            lineno,
            lines_after: outcome.lines_after,
        })?;
        Ok(outcome)
    }

    /// Replace the content of line `lineno` with `text`.
    ///
    /// The line keeps its terminator state: a replaced last line without a
    /// trailing terminator stays without one.
    pub fn replace_at(
        &self,
        path: impl AsRef<Path>,
        lineno: usize,
        text: &str,
    ) -> Result<EditOutcome, EditError> {
        let path = path.as_ref();
        self.check_text(text)?;

        let lines_before = self.rewrite_line(
            path,
            lineno,
            0,
            LineAction::Replace(text.as_bytes().to_vec()),
        )?;
        let outcome = EditOutcome {
            lines_before,
            lines_after: lines_before,
        };

        self.record(EditEvent::Replaced {
            path: path.to_path_buf(),
            lineno,
            text: text.to_string(),
            lines_after: outcome.lines_after,
        })?;
        Ok(outcome)
    }

    /// Append `text` as the new last line.
    ///
    /// Not a rewrite: the file is opened in append mode. A terminator is
    /// written first only when the file is non-empty and does not already
    /// end with one, so a non-empty `text` always adds exactly one line.
    pub fn append(&self, path: impl AsRef<Path>, text: &str) -> Result<EditOutcome, EditError> {
        let path = path.as_ref();
        self.check_text(text)?;
        let target = self.guard.validate_path(path)?;

        let mut reader = open_source(&target)?;
        let lines_before = count_lines(&mut reader).map_err(|e| EditError::access(&target, e))?;
        let needs_terminator = ends_unterminated(&target, reader.get_mut())?;
        drop(reader);

        let mut file = OpenOptions::new()
            .append(true)
            .open(&target)
            .map_err(|e| EditError::access(&target, e))?;
        let mut written = Vec::with_capacity(text.len() + 1);
        if needs_terminator {
            written.push(LINE_TERMINATOR);
        }
        written.extend_from_slice(text.as_bytes());
        file.write_all(&written)
            .and_then(|()| file.sync_all())
            .map_err(|e| EditError::access(&target, e))?;
        drop(file);

        let lines_after = self.count_lines(&target)?;

        self.record(EditEvent::Appended {
            path: path.to_path_buf(),
            text: text.to_string(),
            lines_after,
        })?;
        Ok(EditOutcome {
            lines_before,
            lines_after,
        })
    }

    /// Replace every non-overlapping occurrence of `key` with `sub`.
    ///
    /// Line-buffered: the file must pass the line-safety check first. Lines
    /// without a match are copied byte for byte; every substituted line is
    /// written with a trailing terminator, including a last line that had
    /// none. A carriage return before the terminator is line content and is
    /// kept, so CRLF files stay CRLF.
    pub fn replace_substring(
        &self,
        path: impl AsRef<Path>,
        key: &str,
        sub: &str,
    ) -> Result<SubstitutionReport, EditError> {
        let path = path.as_ref();
        if key.is_empty() {
            return Err(EditError::InvalidPattern(
                "substitution key must not be empty".to_string(),
            ));
        }
        self.check_text(key)?;
        self.check_text(sub)?;
        let target = self.guard.validate_path(path)?;

        let mut reader = open_source(&target)?;
        let lines = verify_line_safety(&mut reader, self.max_line_len)?;
        drop(reader);

        let (key_bytes, sub_bytes) = (key.as_bytes(), sub.as_bytes());
        let max_line_len = self.max_line_len;
        let substituted = AtomicRewriter::new(&target, &self.scratch).rewrite_with(|reader, writer| {
            let mut substituted = Vec::new();
            let mut raw = Vec::with_capacity(max_line_len + 1);
            let mut lineno = 0;

            loop {
                raw.clear();
                if reader.read_until(LINE_TERMINATOR, &mut raw)? == 0 {
                    break;
                }
                lineno += 1;

                let line = raw.strip_suffix(&[LINE_TERMINATOR]).unwrap_or(&raw[..]);
                let occurrences = count_occurrences(line, key_bytes);
                if occurrences == 0 {
                    writer.write_all(&raw)?;
                    continue;
                }

                let replaced = substitute_line(line, key_bytes, sub_bytes, occurrences);
                writer.write_all(&replaced)?;
                writer.write_all(&[LINE_TERMINATOR])?;
                substituted.push(LineSubstitution {
                    lineno,
                    occurrences,
                    before: String::from_utf8_lossy(line).into_owned(),
                    after: String::from_utf8_lossy(&replaced).into_owned(),
                });
            }

            Ok(substituted)
        })?;

        let total = substituted.iter().map(|s| s.occurrences).sum();
        log::info!(
            "replaced {} instance(s) of {:?} in {}",
            total,
            key,
            path.display()
        );

        self.record(EditEvent::Substituted {
            path: path.to_path_buf(),
            key: key.to_string(),
            sub: sub.to_string(),
            lines_after: lines,
        })?;
        Ok(SubstitutionReport {
            path: path.to_path_buf(),
            lines: substituted,
            total,
            lines_after: lines,
        })
    }

    /// Validate the target and `lineno`, then rewrite with `action` applied
    /// at that line. `slack` widens the valid range past the last line.
    ///
    /// Returns the line count before the rewrite.
    fn rewrite_line(
        &self,
        path: &Path,
        lineno: usize,
        slack: usize,
        action: LineAction,
    ) -> Result<usize, EditError> {
        let target = self.guard.validate_path(path)?;
        let lines = self.count_lines(&target)?;
        check_range(lineno, lines + slack)?;
        log::debug!(
            "{}: {} lines, editing line {}",
            path.display(),
            lines,
            lineno
        );

        let mut action = Some(action);
        AtomicRewriter::new(&target, &self.scratch).rewrite_lines(|n| {
            if n == lineno {
                action.take().unwrap_or(LineAction::Keep)
            } else {
                LineAction::Keep
            }
        })?;

        Ok(lines)
    }

    /// One call adds or rewrites exactly one line, so text may not contain
    /// a terminator. NUL bytes would make the file unsafe for later
    /// line-buffered operations.
    fn check_text(&self, text: &str) -> Result<(), EditError> {
        if text.as_bytes().contains(&LINE_TERMINATOR) {
            return Err(EditError::InvalidText(
                "text must not contain a line terminator".to_string(),
            ));
        }
        if text.as_bytes().contains(&0) {
            return Err(EditError::InvalidText(
                "text must not contain NUL characters".to_string(),
            ));
        }
        if text.len() > self.max_line_len {
            return Err(EditError::InvalidText(format!(
                "text is {} bytes long, the maximum is {}",
                text.len(),
                self.max_line_len
            )));
        }
        Ok(())
    }

    fn record(&self, event: EditEvent) -> Result<(), EditError> {
        log::info!("{}", event);
        self.audit.record(&event)?;
        Ok(())
    }
}

fn open_source(path: &Path) -> Result<BufReader<File>, EditError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| EditError::access(path, e))
}

fn rewind(path: &Path, reader: &mut BufReader<File>) -> Result<(), EditError> {
    reader
        .seek(SeekFrom::Start(0))
        .map(|_| ())
        .map_err(|e| EditError::access(path, e))
}

fn check_range(lineno: usize, max: usize) -> Result<(), EditError> {
    if lineno == 0 || lineno > max {
        return Err(EditError::LineOutOfRange { lineno, max });
    }
    Ok(())
}

/// Whether the file is non-empty and its last byte is not a terminator.
fn ends_unterminated(path: &Path, file: &mut File) -> Result<bool, EditError> {
    let len = file
        .metadata()
        .map_err(|e| EditError::access(path, e))?
        .len();
    if len == 0 {
        return Ok(false);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))
        .and_then(|_| file.read_exact(&mut last))
        .map_err(|e| EditError::access(path, e))?;
    Ok(last[0] != LINE_TERMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Fixture {
        _dir: tempfile::TempDir,
        config: EditorConfig,
        file: PathBuf,
    }

    impl Fixture {
        fn new(content: &[u8]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = EditorConfig::in_dir(dir.path());
            let file = dir.path().join("a.txt");
            fs::write(&file, content).unwrap();
            Self {
                _dir: dir,
                config,
                file,
            }
        }

        fn editor(&self) -> LineEditor {
            LineEditor::new(&self.config)
        }

        fn content(&self) -> Vec<u8> {
            fs::read(&self.file).unwrap()
        }
    }

    #[test]
    fn test_insert_at_middle() {
        let fx = Fixture::new(b"one\ntwo\nthree\n");
        let outcome = fx.editor().insert_at(&fx.file, 2, "X").unwrap();

        assert_eq!(outcome.lines_after, 4);
        assert_eq!(fx.content(), b"one\nX\ntwo\nthree\n");
        assert!(!fx.config.scratch_path.exists());
    }

    #[test]
    fn test_insert_after_last_line() {
        let fx = Fixture::new(b"one\ntwo");
        let outcome = fx.editor().insert_at(&fx.file, 3, "X").unwrap();
        assert_eq!(outcome.lines_after, 3);
        assert_eq!(fx.content(), b"one\ntwo\nX\n");
    }

    #[test]
    fn test_insert_out_of_range() {
        let fx = Fixture::new(b"one\n");
        let err = fx.editor().insert_at(&fx.file, 3, "X").unwrap_err();
        assert!(matches!(err, EditError::LineOutOfRange { lineno: 3, max: 2 }));
        let err = fx.editor().insert_at(&fx.file, 0, "X").unwrap_err();
        assert!(matches!(err, EditError::LineOutOfRange { lineno: 0, .. }));
    }

    #[test]
    fn test_insert_rejects_multiline_text() {
        let fx = Fixture::new(b"one\n");
        let err = fx.editor().insert_at(&fx.file, 1, "a\nb").unwrap_err();
        assert!(matches!(err, EditError::InvalidText(_)));
        assert_eq!(fx.content(), b"one\n");
    }

    #[test]
    fn test_delete_at() {
        let fx = Fixture::new(b"one\ntwo\nthree");
        let outcome = fx.editor().delete_at(&fx.file, 3).unwrap();
        assert_eq!(outcome.lines_after, 2);
        assert_eq!(fx.content(), b"one\ntwo\n");
    }

    #[test]
    fn test_delete_out_of_range_leaves_file() {
        let fx = Fixture::new(b"one\ntwo\n");
        let err = fx.editor().delete_at(&fx.file, 3).unwrap_err();
        assert!(matches!(err, EditError::LineOutOfRange { lineno: 3, max: 2 }));
        assert_eq!(fx.content(), b"one\ntwo\n");
        assert!(!fx.config.log_path.exists());
    }

    #[test]
    fn test_delete_tolerates_nul_and_long_lines() {
        let mut content = vec![b'x'; 10_000];
        content.extend_from_slice(b"\nmid\0dle\nlast\n");
        let fx = Fixture::new(&content);
        fx.editor().delete_at(&fx.file, 3).unwrap();

        let mut expected = vec![b'x'; 10_000];
        expected.extend_from_slice(b"\nmid\0dle\n");
        assert_eq!(fx.content(), expected);
    }

    #[test]
    fn test_replace_at() {
        let fx = Fixture::new(b"one\ntwo\nthree\n");
        let outcome = fx.editor().replace_at(&fx.file, 2, "TWO").unwrap();
        assert_eq!(outcome.lines_after, 3);
        assert_eq!(fx.content(), b"one\nTWO\nthree\n");
    }

    #[test]
    fn test_replace_last_unterminated_line() {
        let fx = Fixture::new(b"one\ntwo");
        fx.editor().replace_at(&fx.file, 2, "TWO").unwrap();
        assert_eq!(fx.content(), b"one\nTWO");
    }

    #[test]
    fn test_append_to_empty_file() {
        let fx = Fixture::new(b"");
        let editor = fx.editor();
        assert_eq!(editor.count_lines(&fx.file).unwrap(), 0);

        let outcome = editor.append(&fx.file, "hi").unwrap();
        assert_eq!(outcome.lines_after, 1);
        assert_eq!(fx.content(), b"hi");
    }

    #[test]
    fn test_append_adds_terminator_only_when_missing() {
        let fx = Fixture::new(b"one");
        fx.editor().append(&fx.file, "two").unwrap();
        assert_eq!(fx.content(), b"one\ntwo");

        let fx = Fixture::new(b"one\n");
        let outcome = fx.editor().append(&fx.file, "two").unwrap();
        assert_eq!(fx.content(), b"one\ntwo");
        assert_eq!(outcome.lines_after, 2);
    }

    #[test]
    fn test_replace_substring() {
        let fx = Fixture::new(b"aXbXc\nplain\n");
        let report = fx.editor().replace_substring(&fx.file, "X", "-").unwrap();

        assert_eq!(report.total, 2);
        assert_eq!(report.lines_after, 2);
        assert_eq!(
            report.lines,
            vec![LineSubstitution {
                lineno: 1,
                occurrences: 2,
                before: "aXbXc".to_string(),
                after: "a-b-c".to_string(),
            }]
        );
        assert_eq!(fx.content(), b"a-b-c\nplain\n");
    }

    #[test]
    fn test_replace_substring_terminates_last_line() {
        let fx = Fixture::new(b"keep\nlast X");
        fx.editor().replace_substring(&fx.file, "X", "Y").unwrap();
        assert_eq!(fx.content(), b"keep\nlast Y\n");
    }

    #[test]
    fn test_replace_substring_no_match_is_byte_identical() {
        let content = b"no match here\r\nnor here";
        let fx = Fixture::new(content);
        let report = fx.editor().replace_substring(&fx.file, "zzz", "y").unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(fx.content(), content);
    }

    #[test]
    fn test_replace_substring_keeps_crlf_endings() {
        let fx = Fixture::new(b"aXb\r\nplain\r\n");
        fx.editor().replace_substring(&fx.file, "X", "-").unwrap();
        assert_eq!(fx.content(), b"a-b\r\nplain\r\n");
    }

    #[test]
    fn test_replace_substring_empty_key() {
        let fx = Fixture::new(b"abc\n");
        let err = fx.editor().replace_substring(&fx.file, "", "y").unwrap_err();
        assert!(matches!(err, EditError::InvalidPattern(_)));
    }

    #[test]
    fn test_replace_substring_rejects_unsafe_file() {
        let fx = Fixture::new(b"ok\nnul\0here\n");
        let err = fx.editor().replace_substring(&fx.file, "ok", "y").unwrap_err();
        assert!(matches!(err, EditError::Scan(_)));
        assert_eq!(fx.content(), b"ok\nnul\0here\n");
    }

    #[test]
    fn test_show_line() {
        let fx = Fixture::new(b"one\ntwo\nthree");
        let editor = fx.editor();
        assert_eq!(editor.show_line(&fx.file, 3).unwrap(), b"three");
        assert!(matches!(
            editor.show_line(&fx.file, 4),
            Err(EditError::LineOutOfRange { lineno: 4, max: 3 })
        ));
    }

    #[test]
    fn test_edits_are_logged() {
        let fx = Fixture::new(b"one\n");
        let editor = fx.editor();
        editor.append(&fx.file, "two").unwrap();
        editor.delete_at(&fx.file, 1).unwrap();

        let entries = editor.audit_log().entries(None).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].ends_with("Line \"two\" appended | Lines After = 2"));
        assert!(entries[1].ends_with("Line 1 deleted | Lines After = 1"));
    }

    #[test]
    fn test_log_file_is_not_a_valid_target() {
        let fx = Fixture::new(b"one\n");
        let editor = fx.editor();
        editor.append(&fx.file, "two").unwrap();

        let err = editor.delete_at(&fx.config.log_path, 1).unwrap_err();
        assert!(matches!(err, EditError::Target(_)));
    }
}
