use crate::rewrite::RewriteError;
use crate::scan::ScanError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("failed to access log file {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Log file does not exist: {}", path.display())]
    LogMissing { path: PathBuf },

    #[error(
        "Log file {} has been edited by another program ({reason}). \
         Modify the file to meet the constraint or delete it.",
        path.display()
    )]
    LogTampered {
        path: PathBuf,
        #[source]
        reason: ScanError,
    },

    #[error("failed to truncate log file: {0}")]
    Rewrite(#[from] RewriteError),
}
