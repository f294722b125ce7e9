use thiserror::Error;

/// Errors returned by the campaign store client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid campaign endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("Request to campaign store failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Campaign '{id}' not found")]
    NotFound { id: String },

    #[error("Campaign store rejected the request: {message}")]
    Rejected { message: String },

    #[error("Campaign store returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode campaign store response: {0}")]
    Decode(#[source] reqwest::Error),
}
