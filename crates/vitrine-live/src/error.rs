//! Error types for catalog re-fetches.

use thiserror::Error;

/// Errors from fetching a store's product list.
///
/// The live view logs these and keeps showing the previous list.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP request failed.
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("catalog request returned status {0}")]
    Status(u16),

    /// The response body is not a product list.
    #[error("catalog response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured API base URL cannot carry path segments.
    #[error("catalog URL cannot be used as a base: {0}")]
    CannotBeABase(String),
}
