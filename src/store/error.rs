//! Error types and response mapping for the campaign store.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Errors that can occur during campaign store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No campaign with the requested id
    #[error("Campaign '{id}' not found")]
    NotFound { id: String },

    /// A campaign with this id already exists
    #[error("Campaign with id '{id}' already exists")]
    DuplicateId { id: String },

    /// Request body is not a valid campaign document
    #[error("Invalid campaign: {0}")]
    InvalidCampaign(String),

    /// Failed to read or write the data file
    #[error("Failed to access data file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Data file exists but is not a campaign list
    #[error("Data file '{path}' is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Map error variant to appropriate HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::DuplicateId { .. } => StatusCode::BAD_REQUEST,
            StoreError::InvalidCampaign(_) => StatusCode::BAD_REQUEST,
            StoreError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            StoreError::Corrupt { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            StoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error type string for JSON responses
    pub fn error_type(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::DuplicateId { .. } => "duplicate_id",
            StoreError::InvalidCampaign(_) => "invalid_campaign",
            StoreError::Io { .. } => "io_error",
            StoreError::Corrupt { .. } => "corrupt_data",
            StoreError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Campaign store request failed");
        }
        let body = serde_json::json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}
