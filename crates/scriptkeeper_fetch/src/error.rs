//! Error types for fetching scripts.

use core::time::Duration;

/// Errors raised while loading a script.
///
/// These stay inside the fetch layer: the registry only ever sees the
/// standard `Error loading script: <url>` description. The underlying error is
/// logged.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The key is not a loadable URL.
    #[error("invalid script url '{url}': {reason}")]
    InvalidUrl {
        /// The offending key.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Http error (e.g.: connection refused, reset, TLS failure).
    #[error("http error: {0}")]
    Http(String),

    /// The request did not finish within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with a non-success status.
    #[error("unexpected status {status} for {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The requested URL.
        url: String,
    },

    /// The script body exceeded the configured limit.
    #[error("script body exceeds {limit} bytes")]
    TooLarge {
        /// The configured limit in bytes.
        limit: usize,
    },

    /// The script body is not valid UTF-8.
    #[error("script body from {url} is not valid UTF-8: {reason}")]
    InvalidEncoding {
        /// The requested URL.
        url: String,
        /// Where decoding failed.
        reason: String,
    },

    /// The HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    Client(String),

    /// No tokio runtime was available to drive the load.
    #[error("no tokio runtime available")]
    NoRuntime,
}

/// Errors raised while reading a [`FetchConfig`](crate::FetchConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration is not valid JSON or has unknown fields.
    #[error("failed to parse fetch config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value that cannot be used.
    #[error("invalid fetch config field '{field}': {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}
