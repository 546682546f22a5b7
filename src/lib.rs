//! Linepatch: line-oriented text file mutation engine
//!
//! Reads, searches and transactionally rewrites plain-text files line by
//! line, and keeps a bounded audit log of every committed mutation.
//!
//! # Architecture
//!
//! All rewrites compile down to a single primitive: [`AtomicRewriter`], which
//! streams the source through a per-line transform into a scratch file and
//! then swaps the scratch file in. [`LineEditor`] builds insert, delete,
//! replace, append and substring replacement on top of it; [`SearchEngine`]
//! runs read-only literal and pattern searches; [`AuditLog`] records each
//! committed change.
//!
//! # Safety
//!
//! - Every request is validated before anything is written
//! - Originals are never written in place (scratch file + remove + rename)
//! - Files are streamed, never loaded whole
//! - Line-buffered operations verify line length and reject NUL bytes first
//! - Failures past the point of no return name the scratch file to recover
//!
//! Only a single writer is supported. The audit log and scratch file are
//! shared between invocations without locking; running two invocations
//! against the same configuration at once may race.
//!
//! # Example
//!
//! ```no_run
//! use linepatch::{EditorConfig, LineEditor};
//!
//! let editor = LineEditor::new(&EditorConfig::default());
//!
//! match editor.insert_at("notes.txt", 2, "a new second line") {
//!     Ok(outcome) => println!("now {} lines", outcome.lines_after),
//!     Err(e) => eprintln!("edit failed: {}", e),
//! }
//! ```

pub mod audit;
pub mod config;
pub mod edit;
pub mod rewrite;
pub mod safety;
pub mod scan;
pub mod search;

// Re-exports
pub use audit::{AuditLog, EditEvent, LogEntry, LogError};
pub use config::{load_from_path, load_from_str, ConfigError, EditorConfig};
pub use edit::{EditError, EditOutcome, LineEditor, LineSubstitution, SubstitutionReport};
pub use rewrite::{AtomicRewriter, LineAction, RewriteError, RewriteSummary};
pub use safety::{SafetyError, TargetGuard};
pub use scan::{count_lines, verify_line_safety, ScanError};
pub use search::{LineMatch, LineMatcher, SearchEngine, SearchError, SearchReport};
