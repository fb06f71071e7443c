//! Relay error responses
//!
//! Store failures are logged in full here and reduced to a generic message
//! for the caller.

use axum::{
    extract::rejection::StringRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error, warn};

use super::cors_headers;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Upload body was too large or not text
    #[error("unreadable upload body: {0}")]
    Body(#[source] StringRejection),

    /// Upload body was empty once the data-URL prefix was removed
    #[error("empty image payload")]
    EmptyPayload,

    /// Store refused or garbled a write
    #[error("upload failed: {0}")]
    Upload(#[source] StoreError),

    /// Store could not produce the requested blob
    #[error("retrieval failed: {0}")]
    Retrieve(#[source] StoreError),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::Body(rejection) => {
                let status = rejection.status();
                debug!(status = %status, error = %rejection.body_text(), "rejecting upload body");
                if status == StatusCode::PAYLOAD_TOO_LARGE {
                    (status, cors_headers(), "Image too large").into_response()
                } else {
                    (status, cors_headers(), "Invalid image data").into_response()
                }
            }
            RelayError::EmptyPayload => {
                debug!("rejecting empty upload");
                (StatusCode::BAD_REQUEST, cors_headers(), "Invalid image data").into_response()
            }
            RelayError::Upload(err) => {
                error!(error = %err, "upload to blob store failed");
                (StatusCode::INTERNAL_SERVER_ERROR, cors_headers(), "Upload failed").into_response()
            }
            RelayError::Retrieve(StoreError::NotFound(name)) => {
                debug!(name = %name, "image not found");
                (StatusCode::NOT_FOUND, "Image not found").into_response()
            }
            RelayError::Retrieve(err) => {
                warn!(error = %err, "image retrieval failed");
                (StatusCode::NOT_FOUND, "Image not found").into_response()
            }
        }
    }
}
