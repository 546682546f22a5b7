use crate::audit::LogError;
use crate::rewrite::RewriteError;
use crate::safety::SafetyError;
use crate::scan::ScanError;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditError {
    #[error("failed to access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid Input: Line number {lineno} out of range for file (valid range is 1 to {max})")]
    LineOutOfRange { lineno: usize, max: usize },

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("invalid text: {0}")]
    InvalidText(String),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error(transparent)]
    Target(#[from] SafetyError),

    #[error("edit was committed but the audit log could not be updated: {0}")]
    Log(#[from] LogError),
}

impl EditError {
    pub(crate) fn access(path: &Path, source: std::io::Error) -> Self {
        EditError::FileAccess {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True when a rewrite failed after the original was removed.
    pub fn requires_manual_intervention(&self) -> bool {
        self.leftover_scratch().is_some()
    }

    /// The scratch file holding the only copy of the new content, if a
    /// rewrite failed past the point of no return.
    pub fn leftover_scratch(&self) -> Option<&Path> {
        match self {
            EditError::Rewrite(e) | EditError::Log(LogError::Rewrite(e)) => e.leftover_scratch(),
            _ => None,
        }
    }
}
