use thiserror::Error;

use crate::extract::Shape;

/// Errors returned by [`crate::CompletionClient::try_complete`].
#[derive(Debug, Error)]
pub enum LlmError {
    /// No credential was configured; the client never touches the network.
    #[error("completion client disabled: no API key configured")]
    Disabled,

    /// Network, TLS or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("completion service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be deserialized into the expected envelope.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The envelope parsed but held no first choice with text content.
    #[error("completion response contained no message content")]
    EmptyChoices,

    /// The request body could not be encoded.
    #[error("failed to encode completion request: {0}")]
    Encode(#[source] serde_json::Error),

    /// The configured base URL is not a valid URL.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Raised when no JSON value of the requested shape can be recovered from
/// free-form text.
#[derive(Debug, Error)]
#[error("could not extract a JSON {shape} ({reason}) from: {snippet}")]
pub struct ExtractionError {
    pub shape: Shape,
    pub reason: String,
    /// The offending text, truncated for diagnostics.
    pub snippet: String,
}
