//! Transactional file rewrite: scratch file + remove + rename.
//!
//! The original file is never written to. A replacement is streamed into the
//! scratch file, flushed to disk, and only then swapped in. Failures before
//! the swap leave the original untouched; failures during the swap are
//! reported as [`RewriteError::RemoveOriginal`] or [`RewriteError::Rename`]
//! and leave the scratch file on disk for manual recovery.
//!
//! Between removing the original and renaming the scratch file there is a
//! short window in which neither exists under the target name. Only a single
//! writer is supported, so that window is not guarded further.

use crate::scan::{copy_line, skip_line, LineEnd, LINE_TERMINATOR};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("failed to build replacement in scratch file {}: {source}", scratch.display())]
    Stream { scratch: PathBuf, source: io::Error },

    #[error(
        "failed to remove original file {}: {source} (scratch file {} was NOT cleaned up)",
        path.display(),
        scratch.display()
    )]
    RemoveOriginal {
        path: PathBuf,
        scratch: PathBuf,
        source: io::Error,
    },

    #[error(
        "failed to rename scratch file {} to {}: {source} (scratch file remains on disk)",
        scratch.display(),
        path.display()
    )]
    Rename {
        scratch: PathBuf,
        path: PathBuf,
        source: io::Error,
    },
}

impl RewriteError {
    /// True once the original file may already be gone: a person has to
    /// recover the content from the scratch file.
    pub fn requires_manual_intervention(&self) -> bool {
        matches!(
            self,
            RewriteError::RemoveOriginal { .. } | RewriteError::Rename { .. }
        )
    }

    /// Location of the scratch file left behind, if any.
    pub fn leftover_scratch(&self) -> Option<&Path> {
        match self {
            RewriteError::RemoveOriginal { scratch, .. } | RewriteError::Rename { scratch, .. } => {
                Some(scratch)
            }
            _ => None,
        }
    }
}

/// What to do with one line of the source during [`AtomicRewriter::rewrite_lines`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction {
    /// Copy the line verbatim.
    Keep,
    /// Drop the line and its terminator.
    Drop,
    /// Emit these bytes instead of the line, keeping its terminator state.
    /// An empty replacement is always terminated so the line is not lost.
    Replace(Vec<u8>),
    /// Emit these bytes plus a terminator, then copy the line.
    InsertBefore(Vec<u8>),
}

/// Line counts observed during a per-line rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RewriteSummary {
    pub lines_read: usize,
    pub lines_written: usize,
}

/// Rewrites `target` by way of `scratch`.
#[derive(Debug, Clone, Copy)]
pub struct AtomicRewriter<'a> {
    target: &'a Path,
    scratch: &'a Path,
}

impl<'a> AtomicRewriter<'a> {
    pub fn new(target: &'a Path, scratch: &'a Path) -> Self {
        Self { target, scratch }
    }

    /// Stream the whole source through `transform` into the scratch file,
    /// then swap the scratch file in.
    pub fn rewrite_with<T, F>(&self, transform: F) -> Result<T, RewriteError>
    where
        F: FnOnce(&mut BufReader<File>, &mut BufWriter<File>) -> io::Result<T>,
    {
        let source = File::open(self.target).map_err(|source| RewriteError::Open {
            path: self.target.to_path_buf(),
            source,
        })?;
        let permissions = source.metadata().map(|m| m.permissions()).ok();
        let mut reader = BufReader::new(source);

        let scratch = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.scratch)
            .map_err(|source| RewriteError::Open {
                path: self.scratch.to_path_buf(),
                source,
            })?;
        let mut writer = BufWriter::new(scratch);
        log::debug!(
            "rewriting {} via {}",
            self.target.display(),
            self.scratch.display()
        );

        let streamed = transform(&mut reader, &mut writer).and_then(|value| {
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            if let Some(permissions) = permissions {
                file.set_permissions(permissions)?;
            }
            file.sync_all()?;
            Ok(value)
        });
        drop(reader);

        let value = match streamed {
            Ok(value) => value,
            Err(source) => {
                self.discard_scratch();
                return Err(RewriteError::Stream {
                    scratch: self.scratch.to_path_buf(),
                    source,
                });
            }
        };

        self.commit()?;
        Ok(value)
    }

    /// Rewrite line by line.
    ///
    /// `transform` is called with each 1-based line number, then once more
    /// with `line_count + 1` at end of stream, where only
    /// [`LineAction::InsertBefore`] has an effect.
    pub fn rewrite_lines<F>(&self, mut transform: F) -> Result<RewriteSummary, RewriteError>
    where
        F: FnMut(usize) -> LineAction,
    {
        self.rewrite_with(|reader, writer| {
            let mut summary = RewriteSummary::default();
            let mut last_end = LineEnd::Terminated;
            let mut lineno = 1;

            while !reader.fill_buf()?.is_empty() {
                match transform(lineno) {
                    LineAction::Keep => {
                        if let Some(end) = copy_line(reader, writer)? {
                            last_end = end;
                        }
                        summary.lines_written += 1;
                    }
                    LineAction::Drop => {
                        skip_line(reader)?;
                    }
                    LineAction::Replace(text) => {
                        let end = skip_line(reader)?.unwrap_or(LineEnd::Unterminated);
                        writer.write_all(&text)?;
                        let end = if text.is_empty() {
                            LineEnd::Terminated
                        } else {
                            end
                        };
                        if end == LineEnd::Terminated {
                            writer.write_all(&[LINE_TERMINATOR])?;
                        }
                        last_end = end;
                        summary.lines_written += 1;
                    }
                    LineAction::InsertBefore(text) => {
                        writer.write_all(&text)?;
                        writer.write_all(&[LINE_TERMINATOR])?;
                        if let Some(end) = copy_line(reader, writer)? {
                            last_end = end;
                        }
                        summary.lines_written += 2;
                    }
                }
                summary.lines_read += 1;
                lineno += 1;
            }

            if let LineAction::InsertBefore(text) = transform(lineno) {
                if last_end == LineEnd::Unterminated {
                    writer.write_all(&[LINE_TERMINATOR])?;
                }
                writer.write_all(&text)?;
                writer.write_all(&[LINE_TERMINATOR])?;
                summary.lines_written += 1;
            }

            Ok(summary)
        })
    }

    fn commit(&self) -> Result<(), RewriteError> {
        fs::remove_file(self.target).map_err(|source| RewriteError::RemoveOriginal {
            path: self.target.to_path_buf(),
            scratch: self.scratch.to_path_buf(),
            source,
        })?;

        fs::rename(self.scratch, self.target).map_err(|source| RewriteError::Rename {
            scratch: self.scratch.to_path_buf(),
            path: self.target.to_path_buf(),
            source,
        })?;

        log::debug!("replaced {}", self.target.display());
        Ok(())
    }

    fn discard_scratch(&self) {
        if let Err(e) = fs::remove_file(self.scratch) {
            log::warn!(
                "could not remove scratch file {}: {}",
                self.scratch.display(),
                e
            );
        }
    }
}
