//! Error types for the inference layer.

use thiserror::Error;

/// Errors that can occur while talking to the inference service.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// No credential was configured for the service.
    #[error("no API key configured")]
    MissingCredential,

    /// The request could not be built or sent.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success HTTP status.
    #[error("service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The service answered with an explicit error object.
    #[error("{0}")]
    Service(String),

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        InferenceError::Transport(err.to_string())
    }
}
