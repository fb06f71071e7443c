//! GitHub contents API as a blob store
//!
//! Writes go to `PUT /repos/{owner}/{repo}/contents/{id}.jpeg` with a JSON
//! body; reads use the same path with the raw media type so the response
//! body is the file itself.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{BlobStore, BlobStream, StoreError, StoredFile};
use crate::config::StoreConfig;
use crate::images::{ImageId, ImagePayload};

const RAW_MEDIA_TYPE: &str = "application/vnd.github.v3.raw";

/// Create/update request body
#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: &'a str,
}

/// Create/update response; only the echoed file entry matters
#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: Option<ContentEntry>,
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    #[serde(default)]
    path: String,
    sha: Option<String>,
}

/// Blob store backed by a GitHub repository
#[derive(Debug, Clone)]
pub struct GitHubStore {
    client: Client,
    contents_url: String,
    token: String,
}

impl GitHubStore {
    /// Build a store client from configuration
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            contents_url: format!(
                "{}/repos/{}/{}/contents",
                config.api_url.trim_end_matches('/'),
                config.owner,
                config.repo
            ),
            token: config.token.clone(),
        })
    }

    fn file_url(&self, id: &ImageId) -> String {
        format!("{}/{}", self.contents_url, id.file_name())
    }

    /// Check the echoed entry names the file we asked for
    fn confirm_created(id: &ImageId, response: PutContentsResponse) -> Result<StoredFile, StoreError> {
        let expected = id.file_name();
        match response.content {
            Some(entry) if entry.name == expected => Ok(StoredFile {
                name: entry.name,
                path: entry.path,
                sha: entry.sha,
            }),
            other => Err(StoreError::NameMismatch {
                expected,
                actual: other.map(|e| e.name),
            }),
        }
    }
}

#[async_trait]
impl BlobStore for GitHubStore {
    async fn put(
        &self,
        id: &ImageId,
        payload: &ImagePayload,
        message: &str,
    ) -> Result<StoredFile, StoreError> {
        let request = PutContentsRequest {
            message,
            content: payload.as_base64(),
        };

        debug!(id = %id, bytes = payload.as_base64().len(), "writing blob to GitHub");

        let response = self
            .client
            .put(self.file_url(id))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(id = %id, status = %status, body = %body, "GitHub rejected blob write");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: PutContentsResponse = serde_json::from_str(&body)
            .map_err(|e| StoreError::Decode(format!("{}: {}", e, body)))?;

        Self::confirm_created(id, parsed)
    }

    async fn fetch(&self, id: &ImageId) -> Result<BlobStream, StoreError> {
        debug!(id = %id, "reading blob from GitHub");

        let response = self
            .client
            .get(self.file_url(id))
            .bearer_auth(&self.token)
            .header(header::ACCEPT, RAW_MEDIA_TYPE)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {}
            reqwest::StatusCode::NOT_FOUND => {
                return Err(StoreError::NotFound(id.file_name()));
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                warn!(id = %id, status = %status, body = %body, "GitHub blob read failed");
                return Err(StoreError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
        }

        Ok(response.bytes_stream().map_err(StoreError::from).boxed())
    }
}
