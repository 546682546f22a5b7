use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Fewest entries the audit log may be capped at. Retention trims the log
/// down to `log_capacity - MIN_LOG_CAPACITY`, so a smaller cap would underflow.
pub const MIN_LOG_CAPACITY: usize = 10;

pub const DEFAULT_LOG_PATH: &str = "editorback.log";
pub const DEFAULT_SCRATCH_PATH: &str = "tempeditor.tmp";
pub const DEFAULT_LOG_CAPACITY: usize = 200;
pub const DEFAULT_MAX_LINE_LEN: usize = 1022;
pub const DEFAULT_MAX_LOG_LINE_LEN: usize = 2558;

/// Room a log line needs beyond the two texts a substitution entry quotes:
/// timestamp, fixed wording and a short path.
pub const LOG_ENTRY_OVERHEAD: usize = 100;

/// Everything the core needs to know about its environment.
///
/// The audit log and the scratch file are shared on-disk resources with no
/// locking: two invocations pointed at the same paths may race.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Audit log location
    pub log_path: PathBuf,
    /// Scratch file used by every atomic rewrite
    pub scratch_path: PathBuf,
    /// Maximum number of audit entries kept
    pub log_capacity: usize,
    /// Longest line accepted by line-buffered operations (search, substitute)
    pub max_line_len: usize,
    /// Longest audit log line accepted before the log counts as tampered
    pub max_log_line_len: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            scratch_path: PathBuf::from(DEFAULT_SCRATCH_PATH),
            log_capacity: DEFAULT_LOG_CAPACITY,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            max_log_line_len: DEFAULT_MAX_LOG_LINE_LEN,
        }
    }
}

impl EditorConfig {
    /// Default limits with the log and scratch file placed in `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            log_path: dir.join(DEFAULT_LOG_PATH),
            scratch_path: dir.join(DEFAULT_SCRATCH_PATH),
            ..Self::default()
        }
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.log_path.as_os_str().is_empty() {
            issues.push(ValidationIssue::EmptyPath { field: "log_path" });
        }
        if self.scratch_path.as_os_str().is_empty() {
            issues.push(ValidationIssue::EmptyPath {
                field: "scratch_path",
            });
        }
        if !self.log_path.as_os_str().is_empty() && self.log_path == self.scratch_path {
            issues.push(ValidationIssue::SharedPath(self.log_path.clone()));
        }

        if self.log_capacity < MIN_LOG_CAPACITY {
            issues.push(ValidationIssue::CapacityTooSmall(self.log_capacity));
        }

        for (field, value) in [
            ("max_line_len", self.max_line_len),
            ("max_log_line_len", self.max_log_line_len),
        ] {
            if value == 0 {
                issues.push(ValidationIssue::ZeroLimit { field });
            }
        }

        let required = self.max_line_len.saturating_mul(2).saturating_add(LOG_ENTRY_OVERHEAD);
        if self.max_line_len > 0 && self.max_log_line_len > 0 && self.max_log_line_len < required {
            issues.push(ValidationIssue::LogLineTooShort {
                max_log_line_len: self.max_log_line_len,
                required,
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyPath { field: &'static str },
    SharedPath(PathBuf),
    CapacityTooSmall(usize),
    ZeroLimit { field: &'static str },
    LogLineTooShort {
        max_log_line_len: usize,
        required: usize,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyPath { field } => write!(f, "'{field}' must not be empty"),
            ValidationIssue::SharedPath(path) => write!(
                f,
                "log_path and scratch_path must differ (both are '{}')",
                path.display()
            ),
            ValidationIssue::CapacityTooSmall(capacity) => write!(
                f,
                "log_capacity must be at least {MIN_LOG_CAPACITY} (got {capacity})"
            ),
            ValidationIssue::ZeroLimit { field } => write!(f, "'{field}' must be greater than 0"),
            ValidationIssue::LogLineTooShort {
                max_log_line_len,
                required,
            } => write!(
                f,
                "max_log_line_len must be at least twice max_line_len plus {LOG_ENTRY_OVERHEAD} \
                 ({required}, got {max_log_line_len})"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EditorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_collects_all_issues() {
        let config = EditorConfig {
            log_path: PathBuf::from("same.txt"),
            scratch_path: PathBuf::from("same.txt"),
            log_capacity: 5,
            max_line_len: 0,
            max_log_line_len: 10,
        };

        let err = config.validate().unwrap_err();
        assert_eq!(
            err.issues,
            vec![
                ValidationIssue::SharedPath(PathBuf::from("same.txt")),
                ValidationIssue::CapacityTooSmall(5),
                ValidationIssue::ZeroLimit {
                    field: "max_line_len"
                },
            ]
        );
        assert_eq!(err.to_string().lines().count(), 3);
    }

    #[test]
    fn test_log_line_must_fit_substitution_entries() {
        let config = EditorConfig::default().with_max_line_len(2000);
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.issues,
            vec![ValidationIssue::LogLineTooShort {
                max_log_line_len: DEFAULT_MAX_LOG_LINE_LEN,
                required: 4100,
            }]
        );

        let config = EditorConfig {
            max_log_line_len: 4100,
            ..config
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_in_dir_places_managed_files() {
        let config = EditorConfig::in_dir("/tmp/work");
        assert_eq!(config.log_path, PathBuf::from("/tmp/work/editorback.log"));
        assert_eq!(config.scratch_path, PathBuf::from("/tmp/work/tempeditor.tmp"));
        assert_eq!(config.log_capacity, DEFAULT_LOG_CAPACITY);
    }
}
