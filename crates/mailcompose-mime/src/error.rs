//! Error types for MIME operations.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Header key contains characters outside `[A-Za-z0-9_-]`.
    #[error("Invalid header key: {0:?}")]
    InvalidKey(String),

    /// Header key does not fit on a single line.
    #[error("Header key {key:?} does not fit in a line of {max_line_length} characters")]
    KeyTooLong {
        /// The offending key.
        key: String,
        /// Configured line limit.
        max_line_length: usize,
    },

    /// Header line has no `:` separator.
    #[error("Missing ':' separator in header: {0:?}")]
    MissingSeparator(String),

    /// Folded header uses more than two indentation levels.
    #[error("Header folding may only have two levels, found {0}")]
    FoldingTooDeep(usize),

    /// Required header parameter is absent.
    #[error("Missing header parameter: {0}")]
    MissingParameter(String),

    /// Header parameter is not a `key=value` pair.
    #[error("Malformed header parameter: {0:?}")]
    MalformedPair(String),

    /// Date parameter could not be parsed.
    #[error("Invalid date: {0:?}")]
    InvalidDate(String),

    /// Invalid encoder or folding configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Header accepts fewer addresses than given.
    #[error("Header '{header}' takes exactly one address, got {count}")]
    TooManyAddresses {
        /// Header name.
        header: &'static str,
        /// Number of addresses given.
        count: usize,
    },

    /// Header requires at least one address.
    #[error("Header '{0}' requires at least one address")]
    NoAddresses(&'static str),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Invalid encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),
}
