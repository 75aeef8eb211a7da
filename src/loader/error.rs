use std::path::PathBuf;

use thiserror::Error;

use crate::context::ContextError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoaderError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("invalid name filter '{pattern}': {source}")]
    InvalidFilter {
        pattern: String,
        source: regex::Error,
    },

    #[error("no rule factory registered for kind '{0}'")]
    UnknownKind(String),

    #[error("rule type '{0}' did not resolve to a kind name")]
    InvalidKind(String),

    #[error("no registered rule resolves entity '{0}'")]
    Unresolved(String),

    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid rule setup: {0}")]
    Setup(#[from] toml::de::Error),

    #[error("rule setup must be an array of [[rule]] tables")]
    InvalidSetup,
}
