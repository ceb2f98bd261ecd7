//! Object storage access for OCR inputs and result shards.
//!
//! The pipeline only needs three operations against the bucket: upload the
//! source PDF, list the result shards under a prefix, and download a shard.
//! [`BlobStore`] keeps that surface narrow so the pipeline can run against a
//! fake in tests; [`GcsClient`] is the production implementation speaking the
//! Google Cloud Storage JSON API.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Default Cloud Storage API endpoint.
pub const GCS_ENDPOINT: &str = "https://storage.googleapis.com";

/// Errors from object storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{operation} '{key}' returned status {status}")]
    UnexpectedStatus {
        operation: &'static str,
        key: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Narrow object-store interface consumed by the pipeline.
///
/// Implementations are stateless, thread-safe handles; one instance may be
/// shared read-only across concurrently processed documents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload a local file under `remote_key`. Existing objects are
    /// overwritten (last write wins).
    async fn upload(&self, local_path: &Path, remote_key: &str) -> Result<(), StorageError>;

    /// List all object keys under `prefix`, in no particular order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Download an object's full contents.
    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError>;
}

/// Cloud Storage client bound to a single bucket.
///
/// Takes an already-issued bearer token; credential provisioning is the
/// caller's concern.
pub struct GcsClient {
    http: reqwest::Client,
    endpoint: String,
    bucket: String,
    token: String,
}

impl GcsClient {
    /// Create a client for `bucket` authenticated with `token`.
    pub fn new(
        http: reqwest::Client,
        bucket: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            endpoint: GCS_ENDPOINT.to_string(),
            bucket: bucket.into(),
            token: token.into(),
        }
    }

    /// Point the client at a different API endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// The bucket this client is bound to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.endpoint,
            self.bucket,
            urlencoding::encode(key)
        )
    }

    fn upload_url(&self, key: &str) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.endpoint,
            self.bucket,
            urlencoding::encode(key)
        )
    }

    fn list_url(&self) -> String {
        format!("{}/storage/v1/b/{}/o", self.endpoint, self.bucket)
    }
}

#[derive(Debug, Deserialize)]
struct ObjectMeta {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    items: Vec<ObjectMeta>,
    next_page_token: Option<String>,
}

#[async_trait]
impl BlobStore for GcsClient {
    async fn upload(&self, local_path: &Path, remote_key: &str) -> Result<(), StorageError> {
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|source| StorageError::Io {
                path: local_path.to_path_buf(),
                source,
            })?;

        let response = self
            .http
            .post(self.upload_url(remote_key))
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::UnexpectedStatus {
                operation: "upload",
                key: remote_key.to_string(),
                status: response.status(),
            });
        }

        tracing::debug!(key = remote_key, "uploaded object");
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(self.list_url())
                .bearer_auth(&self.token)
                .query(&[("prefix", prefix)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(StorageError::UnexpectedStatus {
                    operation: "list",
                    key: prefix.to_string(),
                    status: response.status(),
                });
            }

            let listing: ListResponse = response.json().await?;
            keys.extend(listing.items.into_iter().map(|object| object.name));

            match listing.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(keys)
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .http
            .get(format!("{}?alt=media", self.object_url(key)))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::UnexpectedStatus {
                operation: "download",
                key: key.to_string(),
                status: response.status(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GcsClient {
        GcsClient::new(reqwest::Client::new(), "ocr-bucket", "token")
    }

    #[test]
    fn test_upload_url_encodes_key() {
        let url = client().upload_url("docs/my report.pdf");
        assert_eq!(
            url,
            "https://storage.googleapis.com/upload/storage/v1/b/ocr-bucket/o\
             ?uploadType=media&name=docs%2Fmy%20report.pdf"
        );
    }

    #[test]
    fn test_object_url_encodes_key() {
        let url = client().object_url("docs/json_output/report_output-1-to-1.json");
        assert_eq!(
            url,
            "https://storage.googleapis.com/storage/v1/b/ocr-bucket/o/\
             docs%2Fjson_output%2Freport_output-1-to-1.json"
        );
    }
}
