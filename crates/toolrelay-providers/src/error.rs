//! Provider error type.

use thiserror::Error;

/// Failure talking to the hosted model API.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// The request never produced a response (DNS, connect, timeout).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status.
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not a valid chat completion.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The API returned a completion without choices.
    #[error("response contained no choices")]
    EmptyResponse,
}
