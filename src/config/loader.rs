//! Editor settings from TOML.
//!
//! Every key is optional; missing keys keep their defaults and unknown keys
//! are rejected. A parsed config is validated as a whole before it is
//! returned, so callers never see a config whose log lines could not hold
//! the entries the editor writes.

use crate::config::schema::{EditorConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where a config came from, for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Inline,
    File(PathBuf),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Inline => f.write_str("inline config"),
            ConfigSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read editor config from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse editor config ({origin}): {source}")]
    Parse {
        origin: ConfigSource,
        source: toml_edit::de::Error,
    },

    #[error("invalid editor config ({origin}): {source}")]
    Invalid {
        origin: ConfigSource,
        source: ValidationError,
    },
}

pub fn load_from_str(input: &str) -> Result<EditorConfig, ConfigError> {
    parse(input, ConfigSource::Inline)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<EditorConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents, ConfigSource::File(path.to_path_buf()))
}

fn parse(input: &str, origin: ConfigSource) -> Result<EditorConfig, ConfigError> {
    let config: EditorConfig = match toml_edit::de::from_str(input) {
        Ok(config) => config,
        Err(source) => return Err(ConfigError::Parse { origin, source }),
    };
    if let Err(source) = config.validate() {
        return Err(ConfigError::Invalid { origin, source });
    }

    log::debug!(
        "editor config from {}: log {} (cap {}), scratch {}",
        origin,
        config.log_path.display(),
        config.log_capacity,
        config.scratch_path.display()
    );
    Ok(config)
}
