//! Blob store abstraction
//!
//! The only persistent state lives behind [`BlobStore`]. Each relay request
//! makes at most one call through it; nothing is retried.

mod github;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::images::{ImageId, ImagePayload};

pub use github::GitHubStore;

/// Streamed blob body
pub type BlobStream = BoxStream<'static, Result<Bytes, StoreError>>;

/// Errors from the blob store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("store created {actual:?}, expected {expected}")]
    NameMismatch {
        expected: String,
        actual: Option<String>,
    },

    #[error("blob not found: {0}")]
    NotFound(String),
}

/// Acknowledgement of a successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// File name the store reports it created
    pub name: String,
    /// Path of the file within the repository
    pub path: String,
    /// Git blob sha, when the store returns one
    pub sha: Option<String>,
}

/// Persistent storage for image blobs
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create or overwrite `<id>.jpeg` with the given base64 content.
    /// `message` is recorded alongside the write for auditing.
    async fn put(
        &self,
        id: &ImageId,
        payload: &ImagePayload,
        message: &str,
    ) -> Result<StoredFile, StoreError>;

    /// Fetch the raw bytes of `<id>.jpeg`
    async fn fetch(&self, id: &ImageId) -> Result<BlobStream, StoreError>;
}
