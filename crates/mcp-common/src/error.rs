/// Error types shared across MCP server crates.
///
/// These errors represent failures while retrieving documents (local files, HTTP endpoints)
/// that are common to any server loading artifacts by reference. Application-specific errors
/// should be defined in each server crate and wrap `CommonError` via `#[from]`.
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("failed to fetch URL: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to fetch URL; response status: {status}")]
    Status { status: reqwest::StatusCode },

    #[error("error opening file {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("document is not valid UTF-8")]
    NotUtf8,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
}
