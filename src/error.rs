use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] confy::ConfyError),

    #[error("downloader not found: {name}")]
    DownloaderNotFound { name: String },

    #[error("failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("failed to write cookie file {path}: {reason}")]
    CookieWrite { path: PathBuf, reason: String },

    #[error("self-update failed: {0}")]
    Update(String),

    #[error("download directory does not exist: {0}")]
    MissingDownloadDir(PathBuf),
}

impl From<self_update::errors::Error> for Error {
    fn from(e: self_update::errors::Error) -> Self {
        Error::Update(e.to_string())
    }
}
