//! Streaming line scanner.
//!
//! Every routine here walks a [`BufRead`] one buffer-sized chunk at a time,
//! so no line is ever held in memory in full. That makes counting and
//! byte-wise copying safe for files with arbitrarily long lines and embedded
//! NUL bytes.
//!
//! Operations that *do* materialize whole lines (substring search, substring
//! replacement, audit log playback) must call [`verify_line_safety`] first and
//! abort if it fails.

use std::io::{self, BufRead, Write};
use thiserror::Error;

/// The single byte that ends a line.
pub const LINE_TERMINATOR: u8 = b'\n';

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Line {line} is too long: max line length allowed for this operation is {max}")]
    LineTooLong { line: usize, max: usize },

    #[error("NUL byte found on line {line}: this operation does not support NUL characters")]
    NulByteFound { line: usize },

    #[error("I/O error while scanning: {0}")]
    Io(#[from] io::Error),
}

/// How the most recently moved line ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnd {
    /// The line was followed by [`LINE_TERMINATOR`].
    Terminated,
    /// The line ran into end-of-file.
    Unterminated,
}

/// Count lines from the current read position to end-of-file.
///
/// An empty stream has zero lines; a trailing segment without a terminator
/// still counts as one line.
pub fn count_lines<R: BufRead>(reader: &mut R) -> io::Result<usize> {
    let mut lines = 0;
    let mut last = None;

    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        lines += buf.iter().filter(|&&b| b == LINE_TERMINATOR).count();
        last = buf.last().copied();
        let len = buf.len();
        reader.consume(len);
    }

    if matches!(last, Some(b) if b != LINE_TERMINATOR) {
        lines += 1;
    }

    Ok(lines)
}

/// Count lines like [`count_lines`], rejecting streams that are unsafe for
/// line-buffered reads.
///
/// Fails on the first line whose content (terminator excluded) exceeds
/// `max_line_len` bytes, or on the first NUL byte. Line numbers in errors are
/// 1-based.
pub fn verify_line_safety<R: BufRead>(
    reader: &mut R,
    max_line_len: usize,
) -> Result<usize, ScanError> {
    let mut terminated = 0;
    let mut current_len = 0;

    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }

        for &byte in buf {
            match byte {
                LINE_TERMINATOR => {
                    terminated += 1;
                    current_len = 0;
                }
                0 => {
                    return Err(ScanError::NulByteFound {
                        line: terminated + 1,
                    })
                }
                _ => {
                    current_len += 1;
                    if current_len > max_line_len {
                        return Err(ScanError::LineTooLong {
                            line: terminated + 1,
                            max: max_line_len,
                        });
                    }
                }
            }
        }

        let len = buf.len();
        reader.consume(len);
    }

    Ok(if current_len > 0 {
        terminated + 1
    } else {
        terminated
    })
}

/// Move exactly one line, terminator included, through `sink`.
///
/// Returns `None` when the reader is already at end-of-file.
fn advance_line<R, F>(reader: &mut R, mut sink: F) -> io::Result<Option<LineEnd>>
where
    R: BufRead,
    F: FnMut(&[u8]) -> io::Result<()>,
{
    let mut seen_any = false;

    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(seen_any.then_some(LineEnd::Unterminated));
        }
        seen_any = true;

        match buf.iter().position(|&b| b == LINE_TERMINATOR) {
            Some(idx) => {
                sink(&buf[..=idx])?;
                reader.consume(idx + 1);
                return Ok(Some(LineEnd::Terminated));
            }
            None => {
                let len = buf.len();
                sink(buf)?;
                reader.consume(len);
            }
        }
    }
}

/// Copy the next line (content and terminator) from `reader` to `writer`.
pub fn copy_line<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
) -> io::Result<Option<LineEnd>> {
    advance_line(reader, |chunk| writer.write_all(chunk))
}

/// Discard the next line (content and terminator).
pub fn skip_line<R: BufRead>(reader: &mut R) -> io::Result<Option<LineEnd>> {
    advance_line(reader, |_| Ok(()))
}

/// Read the content of line `lineno` (1-based), without its terminator.
///
/// Returns `None` when the stream has fewer lines. Tolerates NUL bytes.
pub fn read_line<R: BufRead>(reader: &mut R, lineno: usize) -> io::Result<Option<Vec<u8>>> {
    if lineno == 0 {
        return Ok(None);
    }

    for _ in 1..lineno {
        if skip_line(reader)?.is_none() {
            return Ok(None);
        }
    }

    let mut line = Vec::new();
    match copy_line(reader, &mut line)? {
        None => Ok(None),
        Some(end) => {
            if end == LineEnd::Terminated {
                line.pop();
            }
            Ok(Some(line))
        }
    }
}

/// Number of decimal digits needed to print line numbers up to `count`.
pub fn line_number_width(count: usize) -> usize {
    let mut digits = 1;
    let mut rest = count;
    while rest > 9 {
        rest /= 10;
        digits += 1;
    }
    digits
}
