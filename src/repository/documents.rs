//! DocumentCloud API client.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::{Document, Page};

/// Default DocumentCloud API base.
pub const DOCUMENTCLOUD_API: &str = "https://api.www.documentcloud.org/api";

/// Errors from the document repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("repository request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("document {document_id}: api returned status {status}")]
    UnexpectedStatus {
        document_id: String,
        status: reqwest::StatusCode,
    },
}

/// Read and write access to documents.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Fetch a document's metadata.
    async fn get(&self, document_id: u64) -> Result<Document, RepositoryError>;

    /// Download a document's source PDF.
    async fn download_pdf(&self, document: &Document) -> Result<Vec<u8>, RepositoryError>;

    /// Replace a document's page list with `pages`.
    async fn patch_pages(&self, document_id: u64, pages: &[Page]) -> Result<(), RepositoryError>;
}

/// Page-list patch payload: `{"pages": [...]}`.
#[derive(Serialize)]
struct PagePatch<'a> {
    pages: &'a [Page],
}

/// API client authenticated with an access token.
pub struct DocumentCloudClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl DocumentCloudClient {
    pub fn new(http: reqwest::Client, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: DOCUMENTCLOUD_API.to_string(),
            token: token.into(),
        }
    }

    /// Point the client at a different API base.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn document_url(&self, document_id: u64) -> String {
        format!("{}/documents/{}/", self.base_url, document_id)
    }
}

#[async_trait]
impl DocumentRepository for DocumentCloudClient {
    async fn get(&self, document_id: u64) -> Result<Document, RepositoryError> {
        let response = self
            .http
            .get(self.document_url(document_id))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RepositoryError::UnexpectedStatus {
                document_id: document_id.to_string(),
                status: response.status(),
            });
        }

        Ok(response.json().await?)
    }

    async fn download_pdf(&self, document: &Document) -> Result<Vec<u8>, RepositoryError> {
        let response = self
            .http
            .get(document.pdf_url())
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RepositoryError::UnexpectedStatus {
                document_id: document.id.to_string(),
                status: response.status(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn patch_pages(&self, document_id: u64, pages: &[Page]) -> Result<(), RepositoryError> {
        let response = self
            .http
            .patch(self.document_url(document_id))
            .bearer_auth(&self.token)
            .json(&PagePatch { pages })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RepositoryError::UnexpectedStatus {
                document_id: document_id.to_string(),
                status: response.status(),
            });
        }

        tracing::debug!(document_id, pages = pages.len(), "patched page list");
        Ok(())
    }
}
