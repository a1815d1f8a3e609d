//! Station directory error types.

/// Errors from fetching, caching or resolving stations.
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Station list endpoint returned an error status
    #[error("station list error {status}: {message}")]
    Api { status: u16, message: String },

    /// The station list document was not in the expected shape
    #[error("malformed station list: {message}")]
    Payload { message: String },

    /// Disk cache operation failed
    #[error("cache error: {message}")]
    Cache { message: String },

    /// No station has this exact name, even after a reload
    #[error("station not found: {name}")]
    NotFound { name: String },
}
