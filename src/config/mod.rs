pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, ConfigError, ConfigSource};
pub use schema::{
    EditorConfig, ValidationError, ValidationIssue, LOG_ENTRY_OVERHEAD, MIN_LOG_CAPACITY,
};
