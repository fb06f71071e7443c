//! Image endpoints
//!
//! POST /upload - store a base64 image under a fresh identifier
//! GET /{identifier} - serve a stored image with immutable caching headers

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{rejection::StringRejection, ConnectInfo, FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::info;

use super::{cors_headers, AppState, RelayError};
use crate::images::{ImageId, ImagePayload};

const CACHE_CONTROL_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Who sent an upload, as far as the edge proxy reports it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOrigin {
    pub ip: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
}

impl UploadOrigin {
    /// Commit message recorded with the stored blob
    pub fn audit_message(&self) -> String {
        let part = |value: &Option<String>| value.clone().unwrap_or_else(|| "unknown".to_string());
        format!(
            "Upload from {} {}/{}",
            part(&self.ip),
            part(&self.country),
            part(&self.city)
        )
    }
}

impl FromRequestParts<AppState> for UploadOrigin {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let edge = &state.config.edge;
        let header_value = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let ip = header_value(edge.client_ip_header.as_str()).or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

        Ok(Self {
            ip,
            country: header_value(edge.country_header.as_str()),
            city: header_value(edge.city_header.as_str()),
        })
    }
}

/// Store an uploaded image and return its identifier
pub async fn upload(
    State(state): State<AppState>,
    origin: UploadOrigin,
    body: Result<String, StringRejection>,
) -> Result<Response, RelayError> {
    let body = body.map_err(RelayError::Body)?;
    let payload = ImagePayload::from_body(&body);
    if payload.is_empty() {
        return Err(RelayError::EmptyPayload);
    }

    let id = ImageId::generate();
    let stored = state
        .store
        .put(&id, &payload, &origin.audit_message())
        .await
        .map_err(RelayError::Upload)?;

    info!(
        id = %id,
        path = %stored.path,
        ip = origin.ip.as_deref().unwrap_or("unknown"),
        "image uploaded"
    );

    Ok((
        StatusCode::OK,
        cors_headers(),
        [(header::CONTENT_TYPE, "text/plain")],
        id.to_string(),
    )
        .into_response())
}

/// Serve an image by identifier
///
/// The identifier is the whole path after the leading slash, with dot
/// segments resolved, and is otherwise passed to the store unvalidated.
pub async fn get_image(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, RelayError> {
    let path = uri.path();
    let id = ImageId::from_path(path.strip_prefix('/').unwrap_or(path));
    if id.is_empty() {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }

    // Identifiers are never reused, so a matching ETag means unchanged content
    let etag = id.etag();
    let cached = headers
        .get(header::IF_NONE_MATCH)
        .is_some_and(|v| v.as_bytes() == etag.as_bytes());
    if cached {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let blob = state.store.fetch(&id).await.map_err(RelayError::Retrieve)?;
    let last_modified = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();

    Ok((
        StatusCode::OK,
        cors_headers(),
        [
            (header::CONTENT_TYPE, "image/jpeg".to_string()),
            (header::CACHE_CONTROL, CACHE_CONTROL_IMMUTABLE.to_string()),
            (header::ETAG, etag),
            (header::LAST_MODIFIED, last_modified),
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        Body::from_stream(blob),
    )
        .into_response())
}
