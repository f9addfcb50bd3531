//! Error types for the batch downloader.
//!
//! `Error` covers setup and run-level failures. `FetchError` describes why a
//! single fetch attempt failed; it never escapes the retrying fetcher, which
//! reports the final outcome as a plain `bool`.
use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for fallible library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The target directory could not be created. Fatal: aborts the run
    /// before any item is processed.
    #[error("cannot create target directory {path}: {source}")]
    TargetDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid or inconsistent configuration.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why one fetch attempt did not produce a valid file.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(StatusCode),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The body was received but failed the integrity check.
    #[error("downloaded file appears corrupt ({size} bytes)")]
    Integrity { size: u64 },
}
