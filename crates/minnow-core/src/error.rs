use std::path::PathBuf;
use thiserror::Error;

/// Core error type for minnow operations outside the package engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid registry URL '{url}' in {origin}: {source}")]
    RegistryUrl {
        url: String,
        origin: String,
        #[source]
        source: url::ParseError,
    },
}
