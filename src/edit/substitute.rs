use crate::search::find_bytes;
use serde::Serialize;
use std::path::PathBuf;

/// Replace the first `occurrences` non-overlapping matches of `key` in
/// `line` with `sub`; `occurrences` comes from
/// [`count_occurrences`](crate::search::count_occurrences) on the same line.
///
/// With an exact count the result is allocated once, at its final size. A
/// count past the real number of matches stops at the last match.
pub(crate) fn substitute_line(
    line: &[u8],
    key: &[u8],
    sub: &[u8],
    occurrences: usize,
) -> Vec<u8> {
    let capacity = (line.len() + sub.len() * occurrences).saturating_sub(key.len() * occurrences);
    let mut result = Vec::with_capacity(capacity);
    let mut rest = line;

    for _ in 0..occurrences {
        let Some(at) = find_bytes(rest, key) else {
            break;
        };
        result.extend_from_slice(&rest[..at]);
        result.extend_from_slice(sub);
        rest = &rest[at + key.len()..];
    }
    result.extend_from_slice(rest);
    result
}

/// Before/after view of one rewritten line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineSubstitution {
    pub lineno: usize,
    pub occurrences: usize,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstitutionReport {
    pub path: PathBuf,
    pub lines: Vec<LineSubstitution>,
    /// Substitutions made across the whole file
    pub total: usize,
    /// Line count after the rewrite; substitution never changes it
    pub lines_after: usize,
}
