//! Errors raised while talking to the Segment Public API.

use thiserror::Error;

/// Everything that can go wrong with a single upstream call.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// The request never produced a readable response.
    #[error("{context}: request failed: {source}")]
    Transport {
        /// The operation being performed
        context: String,
        /// The underlying transport failure
        #[source]
        source: reqwest_middleware::Error,
    },

    /// A non-success status without an error body.
    #[error("{context}: upstream returned status {status}: {body}")]
    Status {
        /// The operation being performed
        context: String,
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// The response body didn't have the expected shape.
    #[error("{context}: could not decode response: {source}")]
    Decode {
        /// The operation being performed
        context: String,
        /// The decoding failure
        #[source]
        source: serde_json::Error,
    },

    /// The upstream reported an error in the response envelope.
    #[error("{context}: {kind} - {message}")]
    Upstream {
        /// The operation being performed
        context: String,
        /// Upstream error type, e.g. `unauthorized`
        kind: String,
        /// Upstream error message
        message: String,
    },

    /// A request URL could not be built.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// The client could not be configured.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SegmentError {
    /// Whether the same call can be repeated safely with the same token.
    ///
    /// Upstream application errors (bad token, rate limits) are left to the
    /// caller's policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SegmentError::Transport { .. })
    }
}
