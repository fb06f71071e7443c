//! HTTP API module - upload and retrieval endpoints
//!
//! Routing:
//! - `OPTIONS *` - CORS preflight, answered before routing
//! - `POST /upload` - store a base64 image, respond with its identifier
//! - `GET /{identifier}` - stream the stored image back
//! - anything else - bare 404

mod error;
mod images;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderName, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::store::BlobStore;

pub use error::RelayError;
pub use images::UploadOrigin;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn BlobStore>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn BlobStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(images::get_image))
        .route("/upload", post(images::upload).get(images::get_image))
        .route("/{*identifier}", get(images::get_image))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(method_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Cross-origin headers sent on preflight, upload and image responses
pub(crate) fn cors_headers() -> [(HeaderName, &'static str); 3] {
    [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
    ]
}

/// Answer preflight and unsupported methods before routing
async fn method_gate(request: Request, next: Next) -> Response {
    match *request.method() {
        Method::OPTIONS => (StatusCode::NO_CONTENT, cors_headers()).into_response(),
        Method::GET => next.run(request).await,
        Method::POST if request.uri().path() == "/upload" => next.run(request).await,
        _ => not_found().await,
    }
}

async fn not_found() -> Response {
    StatusCode::NOT_FOUND.into_response()
}
