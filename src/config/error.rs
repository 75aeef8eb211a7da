use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("value of kind '{actual}' is not allowed here (expected {expected})")]
    TypeMismatch { expected: String, actual: String },

    #[error("no searchable property named '{0}'")]
    InvalidProperty(String),

    #[error("position {position} is out of range (length {len})")]
    OutOfRange { position: usize, len: usize },

    #[error("invalid line delimiter '{pattern}': {source}")]
    InvalidDelimiter {
        pattern: String,
        source: regex::Error,
    },

    #[error("required config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
