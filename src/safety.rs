use crate::config::EditorConfig;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Target checks run before any mutation begins.
///
/// A target must exist, must be a regular file, and must not be one of the
/// files the editor itself manages (the audit log and the scratch file).
#[derive(Debug, Clone)]
pub struct TargetGuard {
    /// Paths that may never be edited, as configured (not canonicalized:
    /// they may not exist yet)
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error(
        "Given file path either does not exist or cannot be accessed: {}: {source}",
        path.display()
    )]
    Inaccessible { path: PathBuf, source: io::Error },

    #[error("Given file path refers to non-regular file: {}", .0.display())]
    NotRegularFile(PathBuf),

    #[error(
        "Path is managed by the editor and cannot be modified: {} (reserved: {})",
        path.display(),
        forbidden.display()
    )]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },
}

impl TargetGuard {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            forbidden_paths: vec![config.log_path.clone(), config.scratch_path.clone()],
        }
    }

    /// Check that `path` is a safe mutation target.
    ///
    /// Returns the canonicalized path, so symlinked targets are rewritten in
    /// place instead of being replaced by a regular file.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();

        let metadata = path
            .metadata()
            .map_err(|source| SafetyError::Inaccessible {
                path: path.to_path_buf(),
                source,
            })?;
        if !metadata.is_file() {
            return Err(SafetyError::NotRegularFile(path.to_path_buf()));
        }

        let canonical = path
            .canonicalize()
            .map_err(|source| SafetyError::Inaccessible {
                path: path.to_path_buf(),
                source,
            })?;

        for forbidden in &self.forbidden_paths {
            // A reserved file that does not exist yet cannot collide.
            let Ok(reserved) = forbidden.canonicalize() else {
                continue;
            };
            if canonical == reserved {
                return Err(SafetyError::ForbiddenPath {
                    path: path.to_path_buf(),
                    forbidden: forbidden.clone(),
                });
            }
        }

        Ok(canonical)
    }
}
