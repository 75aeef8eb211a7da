use thiserror::Error;

use crate::config::ConfigError;
use crate::context::ContextError;
use crate::loader::LoaderError;

/// Top-level error type for the wyvern-fnd library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("context error: {0}")]
    Context(#[from] ContextError),

    #[error("loader error: {0}")]
    Loader(#[from] LoaderError),
}
