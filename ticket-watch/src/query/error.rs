//! Query and parse error types.

/// A transport query failed; the date is skipped for this cycle.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// HTTP request failed (network error, connection reset, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The body was not the expected JSON envelope
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },

    /// No answer within the caller's bound
    #[error("query timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Injected or upstream failure without an HTTP status
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// One wire record could not be decoded; only that record is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("record has {found} fields, need at least {required}")]
    TooFewFields { found: usize, required: usize },

    #[error("record has an empty train number")]
    MissingTrainNumber,

    #[error("invalid station code in field {field}: {value:?}")]
    InvalidStation { field: usize, value: String },

    #[error("invalid time in field {field}: {value:?}")]
    InvalidTime { field: usize, value: String },
}
